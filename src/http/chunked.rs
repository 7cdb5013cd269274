//! Incremental chunked transfer-coding decoder.
//!
//! Grounded on `original_source/src/http/Chunked.cpp`'s explicit state
//! machine: chunk-size line, chunk data, the CRLF after data, and the
//! terminating zero-size chunk (trailers, if any, are consumed and
//! discarded).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    Data,
    CrlfAfterData,
    Trailer,
    Done,
    Bad,
}

#[derive(Debug)]
pub struct ChunkedDecoder {
    state: State,
    remaining: usize,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self {
            state: State::Size,
            remaining: 0,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// More input is needed before further progress can be made.
    NeedMore,
    /// The final chunk (and any trailers) has been consumed.
    Done,
    /// The stream violated the chunked grammar.
    Invalid,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds as much of `input` as can be consumed, appending decoded
    /// body bytes to `out`. Returns the number of input bytes consumed
    /// and the resulting step outcome.
    pub fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) -> (usize, Step) {
        let mut pos = 0;

        loop {
            match self.state {
                State::Bad => return (pos, Step::Invalid),
                State::Done => return (pos, Step::Done),
                State::Size => {
                    let Some(nl) = memchr::memchr(b'\n', &input[pos..]) else {
                        return (pos, Step::NeedMore);
                    };
                    let line_end = pos + nl;
                    let mut line = &input[pos..line_end];
                    if line.last() == Some(&b'\r') {
                        line = &line[..line.len() - 1];
                    }
                    // Ignore chunk extensions after ';'.
                    let size_str = match memchr::memchr(b';', line) {
                        Some(i) => &line[..i],
                        None => line,
                    };
                    let Ok(text) = std::str::from_utf8(size_str) else {
                        self.state = State::Bad;
                        return (pos, Step::Invalid);
                    };
                    let Ok(size) = usize::from_str_radix(text.trim(), 16) else {
                        self.state = State::Bad;
                        return (pos, Step::Invalid);
                    };
                    pos = line_end + 1;
                    if size == 0 {
                        self.state = State::Trailer;
                    } else {
                        self.remaining = size;
                        self.state = State::Data;
                    }
                }
                State::Data => {
                    let avail = input.len() - pos;
                    if avail == 0 {
                        return (pos, Step::NeedMore);
                    }
                    let take = avail.min(self.remaining);
                    out.extend_from_slice(&input[pos..pos + take]);
                    pos += take;
                    self.remaining -= take;
                    if self.remaining == 0 {
                        self.state = State::CrlfAfterData;
                    } else {
                        return (pos, Step::NeedMore);
                    }
                }
                State::CrlfAfterData => {
                    // Tolerate bare LF as well as CRLF, matching the
                    // original's lenient terminator handling.
                    match input.get(pos) {
                        None => return (pos, Step::NeedMore),
                        Some(b'\r') => {
                            if input.len() <= pos + 1 {
                                return (pos, Step::NeedMore);
                            }
                            if input[pos + 1] != b'\n' {
                                self.state = State::Bad;
                                return (pos, Step::Invalid);
                            }
                            pos += 2;
                        }
                        Some(b'\n') => pos += 1,
                        Some(_) => {
                            self.state = State::Bad;
                            return (pos, Step::Invalid);
                        }
                    }
                    self.state = State::Size;
                }
                State::Trailer => {
                    let Some(nl) = memchr::memchr(b'\n', &input[pos..]) else {
                        return (pos, Step::NeedMore);
                    };
                    let line_end = pos + nl;
                    let empty = input[pos..line_end].iter().all(|&c| c == b'\r');
                    pos = line_end + 1;
                    if empty {
                        self.state = State::Done;
                        return (pos, Step::Done);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_chunk() {
        let mut d = ChunkedDecoder::new();
        let mut out = Vec::new();
        let input = b"5\r\nhello\r\n0\r\n\r\n";
        let (consumed, step) = d.feed(input, &mut out);
        assert_eq!(step, Step::Done);
        assert_eq!(consumed, input.len());
        assert_eq!(out, b"hello");
    }

    #[test]
    fn decodes_multiple_chunks_across_feeds() {
        let full = b"3\r\nfoo\r\n3\r\nbar\r\n0\r\n\r\n";
        let split = 10;

        let mut d = ChunkedDecoder::new();
        let mut out = Vec::new();
        let (consumed, step) = d.feed(&full[..split], &mut out);
        assert_eq!(step, Step::NeedMore);
        assert!(consumed <= split);
        assert_eq!(out, b"foo");

        let (_consumed2, step2) = d.feed(&full[consumed..], &mut out);
        assert_eq!(step2, Step::Done);
        assert_eq!(out, b"foobar");
    }

    #[test]
    fn rejects_non_hex_size() {
        let mut d = ChunkedDecoder::new();
        let mut out = Vec::new();
        let (_c, step) = d.feed(b"zz\r\n", &mut out);
        assert_eq!(step, Step::Invalid);
    }

    #[test]
    fn tolerates_bare_lf_terminators() {
        let mut d = ChunkedDecoder::new();
        let mut out = Vec::new();
        let (consumed, step) = d.feed(b"2\nhi\n0\n\n", &mut out);
        assert_eq!(step, Step::Done);
        assert_eq!(consumed, 8);
        assert_eq!(out, b"hi");
    }
}
