pub mod compress_images;
pub mod move_images;
pub mod report;
