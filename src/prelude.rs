//! Convenient imports for common functionality.

pub use crate::{
    ConstraintError, ConstraintKind, DbError, DbPool, DbPoolBuilder, DbValue, FieldBindings,
    FieldSlot, FieldValues, MalformedDetailMode, QueryBuilder, QueryOperator, Row, TxHandle,
    build_search_select_fields, get_chunk_size, process_in_chunks,
};
