pub mod fit;
pub mod gpx;

use crate::error::ParseError;
use crate::sample::RawSample;
use std::path::Path;

// extract Vec<RawSample> from one file of a given type
pub trait Parser: Sync {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawSample>, ParseError>;

    fn name(&self) -> &'static str;
}

/// Picks a parser by file name. Anything that is not a FIT file is tried as GPX.
pub fn parser_for(file_path: &Path) -> &'static dyn Parser {
    let file_name = file_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if file_name.ends_with(".fit") || file_name.ends_with(".fit.gz") {
        &fit::FitParser
    } else {
        &gpx::GpxParser
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_by_file_name() {
        assert_eq!(parser_for(Path::new("a/ride.gpx")).name(), "GPX Parser");
        assert_eq!(parser_for(Path::new("a/ride.fit.gz")).name(), "FIT Parser");
        assert_eq!(parser_for(Path::new("a/RIDE.FIT")).name(), "FIT Parser");
        assert_eq!(parser_for(Path::new("a/notes.txt")).name(), "GPX Parser");
    }
}
