pub mod engine;
pub mod matcher;
pub mod predicate;
pub mod protocol;
pub mod worker;

pub use engine::{Batch, InlineStrategy, MatchList, SearchEngine, SearchStrategy};
pub use matcher::TermMatcher;
pub use predicate::{
    CompiledPredicate, QueryBuilder, SearchPredicate, SearchTerm, TermFlags, TermKind,
};
pub use protocol::{JobId, WorkerCommand, WorkerResponse};
pub use worker::{SearchWorker, WorkerStrategy};
