use std::future::Future;

use futures_util::stream::{self, Stream};

use super::errors::Result;

/// Walk an offset-paginated endpoint one item at a time.
///
/// `fetch` receives the offset of the page to load. Paging stops after an
/// empty page or a page shorter than `limit`.
pub(crate) fn paginate_offset<'a, T, F, Fut>(
    start: i64,
    limit: i64,
    fetch: F,
) -> impl Stream<Item = Result<T>> + 'a
where
    T: 'a,
    F: FnMut(i64) -> Fut + 'a,
    Fut: Future<Output = Result<Vec<T>>> + 'a,
{
    struct PaginationState<T, F> {
        offset: i64,
        buffer: Vec<T>,
        finished: bool,
        fetch: F,
    }

    stream::try_unfold(
        PaginationState {
            offset: start,
            buffer: Vec::new(),
            finished: false,
            fetch,
        },
        move |mut state| async move {
            loop {
                if let Some(item) = state.buffer.pop() {
                    return Ok(Some((item, state)));
                }

                if state.finished {
                    return Ok(None);
                }

                let mut items = {
                    let fetch = &mut state.fetch;
                    fetch(state.offset).await?
                };
                let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                state.offset = state.offset.saturating_add(len);
                if len < limit {
                    state.finished = true;
                }
                if items.is_empty() {
                    return Ok(None);
                }

                items.reverse();
                state.buffer = items;
            }
        },
    )
}
