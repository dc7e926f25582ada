use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::Ctx;

const DEFAULT_TEMPLATE: &str = "\
Hi {{name|there}},

I came across your profile and was impressed by your background.

I'd love to connect and explore where our work overlaps.

Best regards,
{{sender|[Your Name]}}
";

const RECRUITING_TEMPLATE: &str = "\
Hi {{name|there}},

I'm {{sender|a recruiter}} at {{company|a tech firm}}. Your experience in {{field|software development}} caught my attention.

We're hiring for {{role|Senior Developer}}. Would you be open to a brief chat?

Best,
{{sender|HR Team}}
";

const SAMPLE_URLS: &str = "\
# One profile URL per line. Lines starting with # are ignored.
# Replace these samples with real targets.

https://www.linkedin.com/in/example-one/
https://www.linkedin.com/in/example-two/
";

pub(crate) fn handle(ctx: &Ctx) -> Result<()> {
    let config = &ctx.config;
    for dir in [
        &config.message_dir,
        &config.urls_dir,
        &config.store_dir,
        &config.log_dir,
    ] {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        println!("dir       {}", dir.display());
    }
    println!("config    {}", ctx.config_path.display());

    write_sample(&config.message_dir.join("default.txt"), DEFAULT_TEMPLATE)?;
    write_sample(&config.message_dir.join("recruitment.txt"), RECRUITING_TEMPLATE)?;
    write_sample(&config.urls_dir.join("demo.txt"), SAMPLE_URLS)?;

    println!();
    println!("Next steps:");
    println!("  1. set [action] command in {}", ctx.config_path.display());
    println!("  2. edit the templates in {}", config.message_dir.display());
    println!("  3. list targets in {}", config.urls_dir.join("demo.txt").display());
    println!("  4. outreach send default.txt demo.txt --dry-run");
    Ok(())
}

/// Write `contents` unless the file already exists.
fn write_sample(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        println!("kept      {}", path.display());
        return Ok(());
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    println!("created   {}", path.display());
    Ok(())
}
