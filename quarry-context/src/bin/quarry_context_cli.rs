use clap::Parser;
use quarry_context::text::{DEFAULT_MAX_WORDS, TextChunker};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// A CLI tool to chunk text files into JSON output using quarry-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Source name recorded with every chunk.
    #[arg(short, long, default_value = "stdin")]
    source: String,

    /// Maximum number of words in each chunk.
    #[arg(short, long, default_value_t = DEFAULT_MAX_WORDS)]
    max_words: usize,
}

#[derive(Serialize)]
struct SerializableChunk<'a> {
    source: &'a str,
    sequence: usize,
    word_count: usize,
    text: String,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let file_content = if let Some(input_path) = &args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let source = match &args.input {
        Some(path) if args.source == "stdin" => path.as_str(),
        _ => args.source.as_str(),
    };

    let chunks: Vec<SerializableChunk> = TextChunker::new(args.max_words)
        .get_chunks(&file_content)
        .into_iter()
        .map(|c| SerializableChunk {
            source,
            sequence: c.sequence,
            word_count: c.word_count,
            text: c.text,
        })
        .collect();

    let json_output = serde_json::to_string_pretty(&chunks)?;
    println!("{json_output}");

    Ok(())
}
