use anyhow::{Context, Result};
use contemplate_filter::{FilterOptions, TagSpec, filter_stream, strip_tags};
use futures_util::{Stream, StreamExt, stream};
use std::env;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};

// Characters per piece, to imitate token-sized deltas.
const TOKEN_CHARS: usize = 4;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let spec = match args.get(2) {
        Some(json) => FilterOptions::from_json(json)
            .and_then(FilterOptions::into_tag_spec)
            .context("invalid filter options")?,
        None => TagSpec::default(),
    };

    match args.get(1).map(String::as_str) {
        Some("batch") => batch(spec).await,
        Some("stream") | None => streaming(spec).await,
        Some(other) => {
            println!("Unknown mode {:?}.", other);
            println!("Usage: contemplate-filter-demo [stream|batch] [options-json]");
            Ok(())
        }
    }
}

async fn batch(spec: TagSpec) -> Result<()> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("failed to read stdin")?;

    print!("{}", strip_tags(&input, &spec)?);
    std::io::stdout().flush()?;
    Ok(())
}

async fn streaming(spec: TagSpec) -> Result<()> {
    log::info!("filtering stdin between {:?} and {:?}", spec.open_tag(), spec.close_tag());

    let mut filtered = filter_stream(token_stream(BufReader::new(tokio::io::stdin())), spec);
    let mut stdout = std::io::stdout();
    while let Some(fragment) = filtered.next().await {
        let fragment = fragment.context("failed to read stdin")?;
        stdout.write_all(fragment.as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}

/// Splits `reader` into token-sized pieces, keeping line terminators as read.
fn token_stream<R>(reader: R) -> impl Stream<Item = std::io::Result<String>> + Send + 'static
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    stream::unfold(reader, |mut reader| async move {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some((Ok(token_pieces(&line)), reader)),
            Err(e) => Some((Err(e), reader)),
        }
    })
    .flat_map(|line: std::io::Result<Vec<String>>| match line {
        Ok(pieces) => stream::iter(pieces.into_iter().map(Ok).collect::<Vec<_>>()),
        Err(e) => stream::iter(vec![Err(e)]),
    })
}

fn token_pieces(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(TOKEN_CHARS).map(|piece| piece.iter().collect()).collect()
}
