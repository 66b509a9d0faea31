/// One `>` header on a FASTA entry: the first whitespace-delimited token is
/// the protein name, the remainder its description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub description: Option<String>,
}

impl Header {
    fn parse(text: &str) -> Header {
        match text.trim().split_once(char::is_whitespace) {
            Some((name, rest)) => Header {
                name: name.into(),
                description: match rest.trim() {
                    "" => None,
                    desc => Some(desc.into()),
                },
            },
            None => Header {
                name: text.trim().into(),
                description: None,
            },
        }
    }
}

/// One FASTA entry. NCBI-style files may pack several headers onto a single
/// entry, separated by Ctrl-A characters, when identical sequences were
/// merged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastaEntry {
    pub headers: Vec<Header>,
    pub sequence: String,
}

#[derive(Clone, Debug, Default)]
pub struct Fasta {
    pub entries: Vec<FastaEntry>,
}

impl Fasta {
    pub fn parse(contents: &str) -> Fasta {
        let mut entries = Vec::new();
        let mut headers: Vec<Header> = Vec::new();
        let mut s = String::new();
        for line in contents.lines() {
            if line.is_empty() {
                continue;
            }
            if let Some(header_line) = line.strip_prefix('>') {
                if !headers.is_empty() && !s.is_empty() {
                    entries.push(FastaEntry {
                        headers: std::mem::take(&mut headers),
                        sequence: std::mem::take(&mut s),
                    });
                }
                headers = header_line.split('\u{1}').map(Header::parse).collect();
                s.clear();
            } else if !headers.is_empty() {
                s.push_str(line.trim());
            }
        }
        if !headers.is_empty() && !s.is_empty() {
            entries.push(FastaEntry {
                headers,
                sequence: s,
            });
        }
        Fasta { entries }
    }
}
