//! Convert a video from the command line

use anyhow::Result;

use crate::convert::{extract_video_id, Converter};
use crate::Site;

pub async fn run(site: &Site, url: &str) -> Result<()> {
    let id = extract_video_id(url)?;
    let converter = Converter::new(&site.config.converter)?;

    match converter.convert(&id).await {
        Ok(conversion) => {
            println!("{}", conversion.title);
            println!("{}", conversion.link);
            Ok(())
        }
        Err(e) => anyhow::bail!(e.user_message()),
    }
}
