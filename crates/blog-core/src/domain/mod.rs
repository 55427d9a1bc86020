//! Domain entities - the core business objects.

mod page;
mod post;
mod taxonomy;
mod user;

pub use page::{POSTS_PER_PAGE, Page, PageRequest};
pub use post::{ImageUpload, Post, PostChanges, PostInput, PostWithRelations, UploadedFile};
pub use taxonomy::{Category, Tag, TagSync};
pub use user::{NewUser, User, mask_email};
