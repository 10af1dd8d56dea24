use clap::Args;

use qzemoji::{resolve, to_tag};

/// Extract an emoji id from a URL or tag
#[derive(Args)]
pub struct ResolveCommand {
    /// Emoji asset URL
    #[arg(long)]
    url: Option<String>,

    /// Emoji tag
    #[arg(long)]
    tag: Option<String>,

    /// Print the id as a tag instead
    #[arg(long)]
    as_tag: bool,
}

impl ResolveCommand {
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let id = resolve(self.url.as_deref(), self.tag.as_deref())?;
        if self.as_tag {
            println!("{}", to_tag(id));
        } else {
            println!("{}", id);
        }
        Ok(())
    }
}
