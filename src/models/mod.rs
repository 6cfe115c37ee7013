pub mod applicant;
pub mod case;
pub mod document;
pub mod loaders;
pub mod record;
pub mod upload;

pub use applicant::{generate_grouping_id, Applicant, Application, ApplicationStatus, ContactDetails, Lender};
pub use case::{CaseAssignment, ScrapedCase, ScrapedContact};
pub use document::{Document, DocumentCategory, UploadBatch};
pub use loaders::{archive_case_file, load_all_case_files, load_case_file};
pub use record::{Datasheet, ProcessedRecord, RemoteRecord, StoreResponse};
pub use upload::{ApplicantPayload, QueueStatus, UploadFile, UploadReceipt, UploadRequest};
