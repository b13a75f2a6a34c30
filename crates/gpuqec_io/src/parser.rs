//! Parser for textual device function signatures.
//!
//! Signatures are written the way they read in declarations:
//!
//! ```text
//! (self: Decoder @inout, decoder_id: int, return_size: int, reset: int) -> int
//! ```
//!
//! Identifiers naming one of the known modules resolve to that module's
//! handle type; any other unknown identifier is taken as a struct name so the
//! validator can report it. A missing `-> ...` means the function returns
//! `None`.

use gpuqec_core::module::GpuModuleDef;
use gpuqec_core::ty::{FuncInput, FunctionType, InputFlags, NumericKind, Type};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, multispace0};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, value};
use nom::multi::{many0_count, separated_list0};
use nom::sequence::{delimited, pair, preceded, separated_pair, tuple};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureParseError {
    #[error("invalid signature `{input}`: cannot parse from `{rest}`")]
    Syntax { input: String, rest: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeExpr {
    Name(String),
    Array(Box<TypeExpr>, usize),
    Tuple(Vec<TypeExpr>),
}

struct Param {
    name: String,
    ty: TypeExpr,
    flags: InputFlags,
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn ident(i: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(i)
}

fn array(i: &str) -> IResult<&str, TypeExpr> {
    map(
        preceded(
            tag("array"),
            delimited(
                ws(char('[')),
                separated_pair(type_expr, ws(char(',')), map_res(digit1, |s: &str| s.parse::<usize>())),
                ws(char(']')),
            ),
        ),
        |(elem, len)| TypeExpr::Array(Box::new(elem), len),
    )(i)
}

fn tuple_type(i: &str) -> IResult<&str, TypeExpr> {
    map(
        delimited(
            ws(char('(')),
            separated_list0(ws(char(',')), type_expr),
            ws(char(')')),
        ),
        TypeExpr::Tuple,
    )(i)
}

fn type_expr(i: &str) -> IResult<&str, TypeExpr> {
    ws(alt((
        array,
        tuple_type,
        map(ident, |name: &str| TypeExpr::Name(name.to_string())),
    )))(i)
}

fn flag(i: &str) -> IResult<&str, InputFlags> {
    preceded(
        ws(char('@')),
        alt((
            value(InputFlags::Owned, tag("owned")),
            value(InputFlags::Inout, tag("inout")),
        )),
    )(i)
}

fn param(i: &str) -> IResult<&str, Param> {
    map(
        tuple((ws(ident), char(':'), type_expr, opt(ws(flag)))),
        |(name, _, ty, flags)| Param {
            name: name.to_string(),
            ty,
            flags: flags.unwrap_or_default(),
        },
    )(i)
}

fn signature(i: &str) -> IResult<&str, (Vec<Param>, Option<TypeExpr>)> {
    all_consuming(pair(
        delimited(
            ws(char('(')),
            separated_list0(ws(char(',')), param),
            ws(char(')')),
        ),
        opt(preceded(ws(tag("->")), type_expr)),
    ))(i)
}

/// Type names the grammar reserves. Modules cannot use them.
pub const BUILTIN_TYPES: [&str; 5] = ["int", "nat", "float", "bool", "None"];

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

fn resolve(expr: TypeExpr, modules: &[GpuModuleDef]) -> Type {
    match expr {
        TypeExpr::Array(elem, len) => Type::array(resolve(*elem, modules), len),
        TypeExpr::Tuple(elems) => {
            Type::Tuple(elems.into_iter().map(|e| resolve(e, modules)).collect())
        }
        TypeExpr::Name(name) => match name.as_str() {
            "int" => Type::Numeric(NumericKind::Int),
            "nat" => Type::Numeric(NumericKind::Nat),
            "float" => Type::Numeric(NumericKind::Float),
            "bool" => Type::Bool,
            "None" => Type::None,
            _ => modules
                .iter()
                .find(|m| m.name == name)
                .map(GpuModuleDef::handle_type)
                .unwrap_or(Type::Struct(name)),
        },
    }
}

fn syntax_error(input: &str, err: nom::Err<nom::error::Error<&str>>) -> SignatureParseError {
    let rest = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input.to_string(),
        nom::Err::Incomplete(_) => String::new(),
    };
    SignatureParseError::Syntax {
        input: input.to_string(),
        rest,
    }
}

/// Parses a function signature, resolving module names against `modules`.
pub fn parse_signature(
    input: &str,
    modules: &[GpuModuleDef],
) -> Result<FunctionType, SignatureParseError> {
    let (_, (params, output)) = signature(input).map_err(|e| syntax_error(input, e))?;
    let inputs = params
        .into_iter()
        .map(|p| FuncInput {
            name: p.name,
            ty: resolve(p.ty, modules),
            flags: p.flags,
        })
        .collect();
    let output = output.map_or(Type::None, |o| resolve(o, modules));
    Ok(FunctionType::new(inputs, output))
}

/// Parses a single type.
pub fn parse_type(input: &str, modules: &[GpuModuleDef]) -> Result<Type, SignatureParseError> {
    let (_, expr) = all_consuming(type_expr)(input).map_err(|e| syntax_error(input, e))?;
    Ok(resolve(expr, modules))
}
