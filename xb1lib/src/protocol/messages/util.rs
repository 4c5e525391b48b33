//! General parsing utilities for frame bodies.

use crate::protocol::parse::Parse;

/// Parse a statically-sized array with a parser.
pub fn parse_array<I, P, A, const LEN: usize>(
    parser: P,
) -> impl FnMut(I) -> nom::IResult<I, [A; LEN]>
where
    I: Parse,
    P: Fn(I) -> nom::IResult<I, A>,
    A: Default + Copy,
{
    move |input| {
        let mut data = [A::default(); LEN];
        let (input, _) = nom::multi::fill(&parser, &mut data[..])(input)?;
        Ok((input, data))
    }
}

/// Parse a two-letter AT command name.
pub fn parse_at_name<I>(input: I) -> nom::IResult<I, [u8; 2]>
where
    I: Parse,
{
    parse_array(nom::number::complete::u8)(input)
}
