//! Operand expressions.
//!
//! An operand is a sum of terms. Each term is an integer literal or a symbol
//! scaled by `factor / divisor`, e.g. `buf*2+1`, `-table/4`, `0x20-end`.
//! Nothing fails here: text that is not a literal is taken as a symbol name
//! and surfaces as an undefined symbol when the program is resolved.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Literal already multiplied by its factor.
    Literal(i64),
    Symbol {
        name: String,
        factor: i64,
        divisor: i64,
    },
}

pub fn parse(text: &str) -> Vec<Term> {
    let mut terms = vec![];
    resolve(text, 1, 1, &mut terms);
    terms
}

fn resolve(text: &str, factor: i64, divisor: i64, terms: &mut Vec<Term>) {
    // Split at the first binary `+`/`-`; the suffix keeps its sign.
    if let Some(pos) = text
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '+' || c == '-')
        .map(|(i, _)| i)
    {
        resolve(&text[..pos], factor, divisor, terms);
        resolve(&text[pos..], factor, divisor, terms);
        return;
    }

    let (text, factor) = match text.strip_prefix('-') {
        Some(rest) => (rest, factor.wrapping_neg()),
        None => (text.strip_prefix('+').unwrap_or(text), factor),
    };

    // Trailing `*n` and `/n` scale the term.
    let bytes = text.as_bytes();
    for i in (1..bytes.len()).rev() {
        match bytes[i] {
            b'0'..=b'9' => continue,
            op @ (b'*' | b'/') if i + 1 < bytes.len() => {
                let Ok(n) = text[i + 1..].parse::<i64>() else {
                    break;
                };
                let (factor, divisor) = match op {
                    b'*' => (factor.wrapping_mul(n), divisor),
                    _ => (factor, divisor.wrapping_mul(n)),
                };
                resolve(&text[..i], factor, divisor, terms);
                return;
            }
            _ => break,
        }
    }

    match parse_int(text) {
        Some(value) => terms.push(Term::Literal(value.wrapping_mul(factor))),
        None => terms.push(Term::Symbol {
            name: text.to_string(),
            factor,
            divisor,
        }),
    }
}

/// Integer literal with C prefixes: `0x` hex, leading `0` octal, otherwise
/// decimal. An optional sign is accepted. The whole text must be consumed.
pub fn parse_int(text: &str) -> Option<i64> {
    let (neg, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (digits, radix) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        (hex, 16)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let value = i64::from_str_radix(digits, radix).ok()?;
    Some(if neg { -value } else { value })
}
