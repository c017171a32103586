pub mod current;
pub mod history;

pub use current::current;
pub use history::history;
