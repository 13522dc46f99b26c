pub mod auth;
pub mod file;
pub mod listing;
pub mod token;
pub mod upload;
pub mod user;

pub use auth::AuthService;
pub use file::FileRepository;
pub use listing::{ListingService, Page, PageCursor};
pub use token::{TokenCodec, TokenStatus};
pub use upload::{UploadForm, UploadReceipt, UploadService};
pub use user::UserRepository;
