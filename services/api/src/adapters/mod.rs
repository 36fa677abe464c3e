pub mod db;
pub mod passcode;
pub mod pdf;

pub use db::DbAdapter;
pub use passcode::Argon2Hasher;
pub use pdf::ChromiumPdfAdapter;
