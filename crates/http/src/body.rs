use a2a_chat_model::ResponseBody;
use bytes::Bytes;
use reqwest::Response;

use crate::Error;

/// The streamed body of a successful response.
///
/// Dropping it closes the connection.
#[derive(Debug)]
pub struct HttpBody {
    response: Response,
}

impl HttpBody {
    #[inline]
    pub(crate) fn from_response(response: Response) -> Self {
        Self { response }
    }
}

impl ResponseBody for HttpBody {
    type Error = crate::Error;

    #[inline]
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Self::Error> {
        self.response.chunk().await.map_err(Error::from_reqwest)
    }
}
