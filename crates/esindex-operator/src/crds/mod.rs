pub mod binding;
pub mod esindex;
