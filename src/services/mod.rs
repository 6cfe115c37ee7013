//! 业务能力层（Services）
//!
//! 每个服务只处理单个对象（一个文件名、一位申请人、一个批次），不关心流程顺序。

pub mod batch_assembler;
pub mod classifier;
pub mod matching_service;
pub mod record_writer;
pub mod warn_writer;

pub use batch_assembler::BatchAssembler;
pub use classifier::{classify, KeywordTable, MatchMode};
pub use matching_service::{FetchFailurePolicy, MatchOutcome, Matcher};
pub use record_writer::RecordWriter;
pub use warn_writer::WarnWriter;
