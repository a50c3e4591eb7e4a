//! Line framing for streamed HTTP bodies (NDJSON and SSE).

use std::pin::Pin;

use futures_util::stream::{self, BoxStream, Stream, StreamExt};

use crate::traits::BackendError;

struct LineState<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

/// Split a byte stream into lines, without the trailing `\n` / `\r\n`.
///
/// Bytes are buffered until a full line is available, so a multi-byte UTF-8
/// character split across two chunks is decoded correctly. A trailing line
/// without a newline is yielded when the body ends. The first transport
/// error is yielded and ends the stream.
pub fn lines<S, B, E>(body: S) -> BoxStream<'static, Result<String, BackendError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<BackendError> + Send + 'static,
{
    let state = LineState {
        inner: Box::pin(body),
        buffer: Vec::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(pos) = st.buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = st.buffer.drain(..=pos).collect();
                return Some((Ok(decode_line(&raw[..pos])), st));
            }

            if st.finished {
                if st.buffer.is_empty() {
                    return None;
                }
                let rest = std::mem::take(&mut st.buffer);
                return Some((Ok(decode_line(&rest)), st));
            }

            match st.inner.next().await {
                Some(Ok(bytes)) => st.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    st.finished = true;
                    st.buffer.clear();
                    return Some((Err(e.into()), st));
                }
                None => st.finished = true,
            }
        }
    })
    .boxed()
}

fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches('\r').to_string()
}
