pub mod documents;
pub mod history;
pub mod object_store;
pub mod persister;
pub mod records;
pub mod signing;

pub use documents::{Document, DocumentStore, LocalDocumentStore};
pub use history::{ResultEntry, list_results};
pub use object_store::{LocalObjectStore, ObjectMetadata, ObjectStore, StoredObject};
pub use persister::{PersistedResult, save_generated_image, to_document};
pub use records::*;
pub use signing::UrlSigner;
