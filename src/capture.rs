//! Pass-through response body that keeps a copy of what it forwards.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use bytes::BytesMut;
use http_body::{Body as _, Frame, SizeHint};

use crate::record::RequestRecord;
use crate::sink::LogSink;

/// Body wrapper that mirrors every forwarded data frame into a buffer.
///
/// Frames reach the client exactly as the inner body produced them; the copy
/// is a side channel, never a cache, and nothing is withheld or re-chunked.
/// When the stream ends (or the body is dropped early, as for HEAD responses
/// or disconnected clients), the pending record is completed with the
/// captured bytes and emitted to the sink exactly once.
pub struct CaptureBody {
    inner: Body,
    captured: BytesMut,
    pending: Option<Pending>,
}

struct Pending {
    record: RequestRecord,
    sink: Arc<dyn LogSink>,
}

impl CaptureBody {
    /// Wrap `inner`, completing and emitting `record` once the stream ends.
    pub fn new(inner: Body, record: RequestRecord, sink: Arc<dyn LogSink>) -> Self {
        Self {
            inner,
            captured: BytesMut::new(),
            pending: Some(Pending { record, sink }),
        }
    }

    /// Emit the pending record with the bytes captured so far. No-op after
    /// the first call.
    fn finish(&mut self) {
        if let Some(Pending { mut record, sink }) = self.pending.take() {
            record.response_body = Some(String::from_utf8_lossy(&self.captured).into_owned());
            sink.emit(&record);
        }
    }
}

impl http_body::Body for CaptureBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.captured.extend_from_slice(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CaptureBody {
    fn drop(&mut self) {
        self.finish();
    }
}
