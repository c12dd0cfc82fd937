use std::io::{BufRead, Write};
use wordscout::SearchError;

pub const BANNER: &str = "FILE PROCESSING WORD COUNTER W/ MULTIPROCESSING AND MULTITHREADING";

/// Prints the banner and asks for the word to count.
///
/// Returns the first whitespace-delimited token read from `input`; blank lines
/// are skipped. End of input without a token is an empty pattern.
pub fn prompt_for_word<R: BufRead, W: Write>(
    mut input: R,
    output: &mut W,
) -> Result<String, SearchError> {
    writeln!(output, "{}", BANNER)?;
    writeln!(output, "{}", "*".repeat(BANNER.len()))?;
    write!(output, "Please enter the word to count: ")?;
    output.flush()?;

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(SearchError::EmptyPattern);
        }
        if let Some(word) = line.split_whitespace().next() {
            writeln!(output)?;
            return Ok(word.to_string());
        }
    }
}
