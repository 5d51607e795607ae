pub mod deque;
pub mod sorted_set;
pub mod stream;
pub mod stream_id;

pub use deque::Deque;
pub use sorted_set::SortedSet;
pub use stream::{Entry, Stream};
pub use stream_id::{StreamId, StreamIdError};
