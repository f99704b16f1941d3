//! Byte-level tokenizing for PDF values and indirect objects. This is the
//! internal half of the tokenizer boundary described as "out of scope" in
//! the system's external-collaborator list: it exists because the rest of
//! the crate cannot be exercised without something that turns bytes into
//! `Object`s, but it is deliberately minimal (classic structure only, no
//! object streams, no encryption).

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_till, take_while, take_while1};
use nom::character::complete::{char, digit1};
use nom::combinator::{map, map_res, opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;

use crate::dictionary::Dictionary;
use crate::object::{Object, ObjectId, Stream, StringFormat};

pub type Input<'a> = &'a [u8];

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0c | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

fn comment(input: Input) -> IResult<Input, ()> {
    value((), pair(char('%'), take_till(|b| b == b'\n' || b == b'\r')))(input)
}

/// Skips whitespace and comments between tokens.
pub fn space(input: Input) -> IResult<Input, ()> {
    value(
        (),
        many0(alt((value((), take_while1(is_whitespace)), comment))),
    )(input)
}

fn ws<'a, F, O>(mut inner: F) -> impl FnMut(Input<'a>) -> IResult<Input<'a>, O>
where
    F: FnMut(Input<'a>) -> IResult<Input<'a>, O>,
{
    move |input: Input<'a>| {
        let (input, _) = space(input)?;
        inner(input)
    }
}

fn hex_digit_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

pub fn name(input: Input) -> IResult<Input, Vec<u8>> {
    ws(preceded(char('/'), |input: Input| {
        let (input, raw) = take_while(is_regular)(input)?;
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                if let (Some(hi), Some(lo)) = (hex_digit_value(raw[i + 1]), hex_digit_value(raw[i + 2])) {
                    out.push(hi * 16 + lo);
                    i += 3;
                    continue;
                }
            }
            out.push(raw[i]);
            i += 1;
        }
        Ok((input, out))
    }))(input)
}

pub fn integer(input: Input) -> IResult<Input, i64> {
    ws(map_res(
        recognize(pair(opt(alt((char('+'), char('-')))), digit1)),
        |s: Input| std::str::from_utf8(s).unwrap().parse::<i64>(),
    ))(input)
}

pub fn real(input: Input) -> IResult<Input, f64> {
    ws(map_res(
        recognize(tuple((
            opt(alt((char('+'), char('-')))),
            alt((
                recognize(tuple((digit1, char('.'), nom::combinator::opt(digit1)))),
                recognize(tuple((char('.'), digit1))),
            )),
        ))),
        |s: Input| std::str::from_utf8(s).unwrap().parse::<f64>(),
    ))(input)
}

pub fn boolean(input: Input) -> IResult<Input, bool> {
    ws(alt((value(true, tag("true")), value(false, tag("false")))))(input)
}

pub fn null(input: Input) -> IResult<Input, ()> {
    ws(value((), tag("null")))(input)
}

fn literal_string(input: Input) -> IResult<Input, Vec<u8>> {
    ws(|input: Input| {
        let (mut input, _) = char('(')(input)?;
        let mut out = Vec::new();
        let mut depth = 1usize;
        loop {
            let b = *input.first().ok_or(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Eof,
            )))?;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                    input = &input[1..];
                }
                b')' => {
                    depth -= 1;
                    input = &input[1..];
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\\' => {
                    input = &input[1..];
                    let esc = *input.first().ok_or(nom::Err::Error(nom::error::Error::new(
                        input,
                        nom::error::ErrorKind::Eof,
                    )))?;
                    match esc {
                        b'n' => {
                            out.push(b'\n');
                            input = &input[1..];
                        }
                        b'r' => {
                            out.push(b'\r');
                            input = &input[1..];
                        }
                        b't' => {
                            out.push(b'\t');
                            input = &input[1..];
                        }
                        b'b' => {
                            out.push(0x08);
                            input = &input[1..];
                        }
                        b'f' => {
                            out.push(0x0c);
                            input = &input[1..];
                        }
                        b'(' | b')' | b'\\' => {
                            out.push(esc);
                            input = &input[1..];
                        }
                        b'\r' => {
                            input = &input[1..];
                            if input.first() == Some(&b'\n') {
                                input = &input[1..];
                            }
                        }
                        b'\n' => {
                            input = &input[1..];
                        }
                        b'0'..=b'7' => {
                            let mut val = 0u32;
                            let mut n = 0;
                            while n < 3 && input.first().is_some_and(|c| (b'0'..=b'7').contains(c)) {
                                val = val * 8 + (input[0] - b'0') as u32;
                                input = &input[1..];
                                n += 1;
                            }
                            out.push(val as u8);
                        }
                        _ => {
                            out.push(esc);
                            input = &input[1..];
                        }
                    }
                }
                _ => {
                    out.push(b);
                    input = &input[1..];
                }
            }
        }
        Ok((input, out))
    })(input)
}

fn hex_string(input: Input) -> IResult<Input, Vec<u8>> {
    ws(delimited(
        char('<'),
        |input: Input| {
            let (input, digits) = take_while(|b: u8| hex_digit_value(b).is_some() || is_whitespace(b))(input)?;
            let cleaned: Vec<u8> = digits.iter().copied().filter(|b| !is_whitespace(*b)).collect();
            let mut out = Vec::with_capacity(cleaned.len().div_ceil(2));
            let mut i = 0;
            while i < cleaned.len() {
                let hi = hex_digit_value(cleaned[i]).unwrap();
                let lo = if i + 1 < cleaned.len() {
                    hex_digit_value(cleaned[i + 1]).unwrap()
                } else {
                    0
                };
                out.push(hi * 16 + lo);
                i += 2;
            }
            Ok((input, out))
        },
        char('>'),
    ))(input)
}

pub fn array(input: Input) -> IResult<Input, Vec<Object>> {
    ws(delimited(char('['), many0(object), ws(char(']'))))(input)
}

pub fn dictionary(input: Input) -> IResult<Input, Dictionary> {
    ws(map(
        delimited(tag("<<"), many0(pair(name, object)), ws(tag(">>"))),
        |pairs| pairs.into_iter().collect::<Dictionary>(),
    ))(input)
}

/// Distinguishes `N G R` (an indirect reference) from a bare integer by
/// trying the three-token form first and backtracking on failure.
fn reference(input: Input) -> IResult<Input, ObjectId> {
    let (rest, (num, gen, _)) = tuple((integer, integer, ws(char('R'))))(input)?;
    Ok((rest, (num as u32, gen as u16)))
}

pub fn object(input: Input) -> IResult<Input, Object> {
    alt((
        map(reference, Object::Reference),
        map(real, Object::Real),
        map(integer, Object::Integer),
        map(boolean, Object::Boolean),
        map(null, |_| Object::Null),
        map(name, Object::Name),
        map(dictionary, Object::Dictionary),
        map(array, Object::Array),
        map(hex_string, |s| Object::String(s, StringFormat::Hexadecimal)),
        map(literal_string, |s| Object::String(s, StringFormat::Literal)),
    ))(input)
}

/// `%PDF-1.x` header, returning `"1.x"`.
pub fn header(input: Input) -> Option<String> {
    let pos = input.windows(5).position(|w| w == b"%PDF-")?;
    let rest = &input[pos + 5..];
    let digits: Vec<u8> = rest
        .iter()
        .take_while(|&&b| b.is_ascii_digit() || b == b'.')
        .copied()
        .collect();
    if digits.is_empty() {
        return None;
    }
    Some(String::from_utf8(digits).ok()?)
}

/// Parses a full `oid gen obj ... endobj` record anchored at byte 0 of
/// `input` (callers slice to the xref-reported offset first). Stream
/// content, if present, is captured verbatim by `/Length` — filters are
/// never decoded (non-goal).
pub fn indirect_object(input: Input) -> IResult<Input, (ObjectId, Object)> {
    let (rest, (num, gen, _)) = tuple((integer, integer, ws(tag("obj"))))(input)?;
    let (rest, value) = object(rest)?;
    let (rest, stream_kw) = ws(opt(tag("stream")))(rest)?;
    let (rest, value) = if stream_kw.is_some() {
        let rest = skip_stream_eol(rest);
        let length = value
            .as_dict()
            .ok()
            .and_then(|d| d.get(b"Length").ok())
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .max(0) as usize;
        let length = length.min(rest.len());
        let content = rest[..length].to_vec();
        let rest = &rest[length..];
        let (rest, _) = ws(tag("endstream"))(rest)?;
        let dict = match value {
            Object::Dictionary(d) => d,
            _ => Dictionary::new(),
        };
        let stream = Stream::new(dict, content);
        (rest, Object::Stream(stream))
    } else {
        (rest, value)
    };
    let (rest, _) = ws(tag("endobj"))(rest)?;
    Ok((rest, ((num as u32, gen as u16), value)))
}

fn skip_stream_eol(input: Input) -> Input {
    if input.first() == Some(&b'\r') && input.get(1) == Some(&b'\n') {
        &input[2..]
    } else if input.first() == Some(&b'\n') || input.first() == Some(&b'\r') {
        &input[1..]
    } else {
        input
    }
}

pub fn take_n(input: Input, n: usize) -> IResult<Input, Input> {
    take(n)(input)
}
