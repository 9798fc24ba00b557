//! Scans the command stream into run-coalesced tokens, one nesting level at
//! a time.

use crate::errors::{CompilationError, Reason};

/// The classification of a [Token].
///
/// The discriminant order is part of the encoder's template table, so don't
/// reorder these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    PointerInc,
    PointerDec,
    CellInc,
    CellDec,
    Output,
    Input,
    Loop,
    Skip,
}

/// One classified, run-coalesced unit of the command stream.
///
/// The half-open `start..end` range covers the source bytes the token spans.
/// For the four arithmetic kinds the range length is the run count. For
/// [TokenKind::Loop] the range is the bracket-delimited interior, exclusive
/// of the brackets themselves; it stays unscanned until the loop is
/// compiled.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// Length of the spanned range; the run count for arithmetic kinds.
    pub fn run_length(&self) -> usize {
        self.end - self.start
    }
}

/// Classifies the token starting at `at` and returns it along with the
/// position immediately following it.
///
/// A `]` reached directly by a scan is always unmatched (matched closing
/// brackets are consumed as loop terminators), so it fails here.
pub fn next_token(
    source: &[u8],
    at: usize,
    end: usize,
) -> Result<(Token, usize), CompilationError> {
    let c = source[at];

    match c {
        b'+' | b'-' | b'>' | b'<' => {
            let mut next = at + 1;
            while next < end && source[next] == c {
                next += 1;
            }

            let kind = match c {
                b'+' => TokenKind::CellInc,
                b'-' => TokenKind::CellDec,
                b'>' => TokenKind::PointerInc,
                _ => TokenKind::PointerDec,
            };

            Ok((
                Token {
                    kind,
                    start: at,
                    end: next,
                },
                next,
            ))
        }
        b'[' => {
            let close = find_closing_bracket(source, at, end)?;
            Ok((
                Token {
                    kind: TokenKind::Loop,
                    start: at + 1,
                    end: close,
                },
                close + 1,
            ))
        }
        b']' => Err(CompilationError::new(Reason::UnbalancedBrackets, at)),
        b'.' | b',' => {
            let kind = if c == b'.' {
                TokenKind::Output
            } else {
                TokenKind::Input
            };

            Ok((
                Token {
                    kind,
                    start: at,
                    end: at + 1,
                },
                at + 1,
            ))
        }
        _ => Ok((
            Token {
                kind: TokenKind::Skip,
                start: at,
                end: at + 1,
            },
            at + 1,
        )),
    }
}

/// Finds the `]` matching the `[` at `open` by nesting-depth counting.
pub fn find_closing_bracket(
    source: &[u8],
    open: usize,
    end: usize,
) -> Result<usize, CompilationError> {
    let mut depth = 0;

    for at in open..end {
        match source[at] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(at);
                }
            }
            _ => (),
        }
    }

    Err(CompilationError::new(Reason::UnbalancedBrackets, open))
}

/// Tokenizes one whole nesting level, preserving source order.
pub fn tokenize(
    source: &[u8],
    start: usize,
    end: usize,
) -> Result<Vec<Token>, CompilationError> {
    let mut tokens = Vec::new();
    let mut at = start;

    while at < end {
        let (token, next) = next_token(source, at, end)?;
        tokens.push(token);
        at = next;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &[u8]) -> Vec<TokenKind> {
        tokenize(source, 0, source.len())
            .unwrap()
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn coalesces_runs_of_arithmetic_commands() {
        let tokens = tokenize(b"+++", 0, 3).unwrap();
        assert_eq!(1, tokens.len());
        assert_eq!(TokenKind::CellInc, tokens[0].kind);
        assert_eq!(3, tokens[0].run_length());
    }

    #[test]
    fn a_run_ends_where_the_command_changes() {
        use TokenKind::*;
        assert_eq!(
            vec![CellInc, PointerInc, CellDec, PointerDec],
            kinds(b"++>>>--<")
        );

        let tokens = tokenize(b"++>>>--<", 0, 8).unwrap();
        assert_eq!(2, tokens[0].run_length());
        assert_eq!(3, tokens[1].run_length());
        assert_eq!(2, tokens[2].run_length());
        assert_eq!(1, tokens[3].run_length());
    }

    #[test]
    fn io_commands_never_coalesce() {
        use TokenKind::*;
        assert_eq!(vec![Output, Output, Input, Input], kinds(b"..,,"));
    }

    #[test]
    fn a_loop_token_spans_its_interior() {
        let tokens = tokenize(b"[+-]", 0, 4).unwrap();
        assert_eq!(1, tokens.len());
        assert_eq!(TokenKind::Loop, tokens[0].kind);
        assert_eq!(1, tokens[0].start);
        assert_eq!(3, tokens[0].end);
    }

    #[test]
    fn a_loop_interior_is_not_scanned_at_this_level() {
        // One Loop token covers "[>]"; the '>' inside is not classified yet.
        use TokenKind::*;
        assert_eq!(vec![Loop, CellInc], kinds(b"[>]+"));
    }

    #[test]
    fn nested_brackets_match_by_depth() {
        let tokens = tokenize(b"+[a[b]c]-", 0, 9).unwrap();
        assert_eq!(3, tokens.len());
        assert_eq!(TokenKind::Loop, tokens[1].kind);
        assert_eq!(2, tokens[1].start);
        assert_eq!(7, tokens[1].end);
    }

    #[test]
    fn non_command_bytes_are_skipped_one_at_a_time() {
        use TokenKind::*;
        assert_eq!(vec![Skip, CellInc, Skip, Skip], kinds(b"x+ \n"));
    }

    #[test]
    fn an_unmatched_open_bracket_fails() {
        let err = tokenize(b"+[-", 0, 3).unwrap_err();
        assert_eq!(Some(1), err.position());
    }

    #[test]
    fn an_unmatched_close_bracket_fails() {
        let err = tokenize(b"+]", 0, 2).unwrap_err();
        assert_eq!(Some(1), err.position());
    }

    #[test]
    fn an_interleaved_extra_close_bracket_fails() {
        // "[+]]": the loop matches, then the second ']' is unmatched.
        assert!(tokenize(b"[+]]", 0, 4).is_err());
    }
}
