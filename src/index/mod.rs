pub mod barrel_index;
pub mod hitlist;
pub mod html;
pub mod paper;
