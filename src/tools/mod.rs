pub mod fetch_image;
pub mod generate_profile_picture;
pub mod list_generated_images;
pub mod url_validation;

pub use fetch_image::{SourceImage, fetch_source_image};
pub use generate_profile_picture::generate_profile_picture;
pub use list_generated_images::{ListGeneratedImagesRequest, list_generated_images};
pub use url_validation::validate_http_url;
