mod catalog;
mod ids;
mod result;
mod test_detail;

pub use ids::{ParseIdError, TestId};

pub use catalog::{TestSummary, TestSummaryError};
pub use result::{ResultPayload, ResultRecord, sort_most_recent_first};
pub use test_detail::{
    Answer, RawTask, RawTestDetail, Task, TestDetail, TestDetailError, correct_position,
};
