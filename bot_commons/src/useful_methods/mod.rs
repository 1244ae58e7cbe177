use futures::{Future, TryStreamExt};
use teloxide::{
    net::Download,
    requests::Requester,
    types::{FileMeta, Message, PhotoSize},
    Bot, RequestError,
};

pub trait MessageStuff {
    /// Text of the message, or its caption if it's a media message.
    fn text_full(&self) -> Option<&str>;
    /// The largest resolution of the photo attached to this message, if any.
    fn find_biggest_photo(&self) -> Option<&PhotoSize>;
}

impl MessageStuff for Message {
    fn text_full(&self) -> Option<&str> {
        self.text().or_else(|| self.caption())
    }
    fn find_biggest_photo(&self) -> Option<&PhotoSize> {
        self.photo()?.iter().max_by_key(|x| x.width + x.height)
    }
}

pub trait BotStuff {
    /// Download a whole file into memory, appending to `to`.
    fn download_file_to_vec(
        &self,
        file: &FileMeta,
        to: &mut Vec<u8>,
    ) -> impl Future<Output = Result<(), RequestError>> + Send;
}

impl BotStuff for Bot {
    async fn download_file_to_vec(
        &self,
        file: &FileMeta,
        to: &mut Vec<u8>,
    ) -> Result<(), RequestError> {
        let file = self.get_file(file.id.clone()).await?;
        to.reserve_exact(file.size as usize);
        let mut stream = self.download_file_stream(&file.path);

        while let Some(bytes) = stream.try_next().await? {
            to.extend_from_slice(&bytes);
        }

        Ok(())
    }
}
