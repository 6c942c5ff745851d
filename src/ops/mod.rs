pub mod color;
pub mod fill;
pub mod lines;
pub mod script;
pub mod shapes;
