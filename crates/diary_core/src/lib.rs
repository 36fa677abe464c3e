pub mod access;
pub mod compose;
pub mod domain;
pub mod ports;
pub mod sanitize;

pub use access::{authorize, AccessDecision};
pub use domain::{
    AuthSession, Entry, EntryPage, EntryPatch, EntryQuery, EntryStats, NewEntry, SortField,
    SortOrder, User, UserCredentials,
};
pub use ports::{
    DatabaseService, PasscodeHasher, PdfRenderService, PortError, PortResult, RenderError,
};
