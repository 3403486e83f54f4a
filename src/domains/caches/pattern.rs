//! Shell-style glob matching for `KEYS`.
//!
//! Keys are arbitrary bytes, so matching is byte-wise like redis' `stringmatchlen`.
//! Supported syntax: `*` (any run of bytes, including none), `?` (exactly one byte),
//! `[abc]`, `[a-z]`, `[^a]` / `[!a]` (byte classes) and `\x` (literal `x`).
//! An unterminated `[` is matched literally.

#[derive(Debug, Clone, PartialEq, Eq)]
enum GlobToken {
    Literal(u8),
    Single,
    Any,
    CharClass { ranges: Vec<(u8, u8)>, negated: bool },
}

impl GlobToken {
    fn accepts(&self, c: u8) -> bool {
        match self {
            | GlobToken::Literal(l) => *l == c,
            | GlobToken::Single => true,
            | GlobToken::Any => false,
            | GlobToken::CharClass { ranges, negated } => {
                ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&c)) != *negated
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    tokens: Vec<GlobToken>,
}

impl GlobPattern {
    pub fn compile(pattern: impl AsRef<[u8]>) -> Self {
        let chars = pattern.as_ref();
        let mut tokens = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                | b'*' => {
                    if tokens.last() != Some(&GlobToken::Any) {
                        tokens.push(GlobToken::Any);
                    }
                },
                | b'?' => tokens.push(GlobToken::Single),
                | b'\\' if i + 1 < chars.len() => {
                    i += 1;
                    tokens.push(GlobToken::Literal(chars[i]));
                },
                | b'[' => match Self::compile_class(&chars[i + 1..]) {
                    | Some((token, consumed)) => {
                        tokens.push(token);
                        i += consumed;
                    },
                    | None => tokens.push(GlobToken::Literal(b'[')),
                },
                | c => tokens.push(GlobToken::Literal(c)),
            }
            i += 1;
        }

        Self { tokens }
    }

    // Parses the body of a class after '['. Returns the token and how many bytes were consumed,
    // closing ']' included. None if the class is never closed.
    fn compile_class(chars: &[u8]) -> Option<(GlobToken, usize)> {
        let mut i = 0;
        let negated = matches!(chars.first(), Some(b'^') | Some(b'!'));
        if negated {
            i += 1;
        }

        let mut ranges = Vec::new();
        loop {
            let mut c = *chars.get(i)?;
            if c == b']' {
                return Some((GlobToken::CharClass { ranges, negated }, i + 1));
            }
            if c == b'\\' {
                i += 1;
                c = *chars.get(i)?;
            }

            match (chars.get(i + 1), chars.get(i + 2)) {
                | (Some(b'-'), Some(&hi)) if hi != b']' => {
                    let (lo, hi) = if c <= hi { (c, hi) } else { (hi, c) };
                    ranges.push((lo, hi));
                    i += 3;
                },
                | _ => {
                    ranges.push((c, c));
                    i += 1;
                },
            }
        }
    }

    pub fn matches(&self, input: impl AsRef<[u8]>) -> bool {
        let text = input.as_ref();
        let (mut t, mut p) = (0, 0);
        // pattern index right after the last `*` and the text index it is currently absorbing up to
        let mut resume: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.tokens.get(p) {
                | Some(GlobToken::Any) => {
                    p += 1;
                    resume = Some((p, t));
                    continue;
                },
                | Some(token) if token.accepts(text[t]) => {
                    p += 1;
                    t += 1;
                    continue;
                },
                | _ => {},
            }

            let Some((star_p, star_t)) = resume else {
                return false;
            };
            p = star_p;
            t = star_t + 1;
            resume = Some((star_p, t));
        }

        self.tokens[p..].iter().all(|token| *token == GlobToken::Any)
    }
}
