//! Unit string parser with normalization.
//!
//! Unit strings are tokenized and then reduced by a small recursive-descent
//! parser into a map of base symbol to integer exponent. The accepted notations
//! cover the spellings that appear in quantity metadata:
//!
//! - Exponents: `m^2`, `m**2`, `m2`
//! - Multiplication: `kg m`, `kg*m`, `kg·m`
//! - Division: `W/m^2`, `W m^-2`, `W per m^2`
//! - Grouping: `(K) / s`, `(kg/kg) / day`
//!
//! # Grammar
//!
//! ```text
//! expr    = term (('/' | 'per') term)*
//! term    = factor (('*' | '·' | <space>) factor)*
//! factor  = (symbol | '(' expr ')') exponent?
//! symbol  = [a-zA-Z_%]+ [0-9]*
//! exponent = ('^' | '**')? '-'? [0-9]+
//! ```

use super::dimension::Dimension;
use super::registry::{UnitInfo, UNIT_REGISTRY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Error type for unit parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    EmptyUnit,
    UnknownUnit(String),
    InvalidExponent(String),
    UnexpectedChar(char),
    ParseFailed(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUnit => write!(f, "empty unit string"),
            Self::UnknownUnit(u) => write!(f, "unknown unit: '{u}'"),
            Self::InvalidExponent(e) => write!(f, "invalid exponent: '{e}'"),
            Self::UnexpectedChar(c) => write!(f, "unexpected character: '{c}'"),
            Self::ParseFailed(msg) => write!(f, "parse failed: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A parsed unit expression.
///
/// Represents a unit as a product of symbols raised to integer powers, so
/// `W/m^2` becomes `{W: 1, m: -2}`. Zero exponents are never stored, which
/// makes `kg/kg` equal to the dimensionless unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedUnit {
    components: BTreeMap<String, i32>,
}

impl ParsedUnit {
    #[must_use]
    pub fn dimensionless() -> Self {
        Self {
            components: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn from_components(components: BTreeMap<String, i32>) -> Self {
        Self {
            components: components
                .into_iter()
                .filter(|(_, exp)| *exp != 0)
                .collect(),
        }
    }

    fn symbol(symbol: String, exp: i32) -> Self {
        Self::from_components(BTreeMap::from([(symbol, exp)]))
    }

    /// Parses a unit string into a `ParsedUnit`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rgcm_core::units::parser::ParsedUnit;
    ///
    /// let unit = ParsedUnit::parse("K/day").unwrap();
    /// let unit2 = ParsedUnit::parse("K day^-1").unwrap();
    /// assert_eq!(unit, unit2);
    /// ```
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseError::EmptyUnit);
        }
        if input == "1" || input.eq_ignore_ascii_case("dimensionless") {
            return Ok(Self::dimensionless());
        }

        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let unit = parser.expression()?;
        match parser.peek() {
            None => Ok(unit),
            Some(Token::Close) => Err(ParseError::ParseFailed("unbalanced ')'".into())),
            Some(other) => Err(ParseError::ParseFailed(format!(
                "unexpected token {other:?}"
            ))),
        }
    }

    #[must_use]
    pub fn components(&self) -> &BTreeMap<String, i32> {
        &self.components
    }

    /// True if no symbols remain after cancellation.
    ///
    /// `percent` has a component but is still physically dimensionless, see
    /// [`ParsedUnit::is_dimensionless`].
    #[must_use]
    pub fn has_no_components(&self) -> bool {
        self.components.is_empty()
    }

    pub fn is_dimensionless(&self) -> Result<bool, ParseError> {
        Ok(self.dimension()?.is_dimensionless())
    }

    fn infos(&self) -> impl Iterator<Item = Result<(UnitInfo, i32), ParseError>> + '_ {
        self.components.iter().map(|(symbol, &exp)| {
            UNIT_REGISTRY
                .lookup(symbol)
                .map(|info| (info, exp))
                .ok_or_else(|| ParseError::UnknownUnit(symbol.clone()))
        })
    }

    /// Computes the overall dimension of this unit.
    pub fn dimension(&self) -> Result<Dimension, ParseError> {
        self.infos().try_fold(Dimension::dimensionless(), |acc, item| {
            let (info, exp) = item?;
            Ok(acc * info.dimension.pow(exp as i8))
        })
    }

    /// The multiplier that converts a value in this unit to SI base units.
    pub fn to_si_factor(&self) -> Result<f64, ParseError> {
        self.infos().try_fold(1.0, |acc, item| {
            let (info, exp) = item?;
            Ok(acc * info.to_si_factor.powi(exp))
        })
    }

    /// The SI offset of this unit.
    ///
    /// Offsets only apply to a lone absolute temperature symbol such as `degC`.
    /// In any compound (`degC/day`, `degC^2`) the symbol denotes a difference
    /// and the offset is zero.
    pub fn to_si_offset(&self) -> Result<f64, ParseError> {
        let mut iter = self.components.iter();
        match (iter.next(), iter.next()) {
            (Some((symbol, 1)), None) => UNIT_REGISTRY
                .lookup(symbol)
                .map(|info| info.offset)
                .ok_or_else(|| ParseError::UnknownUnit(symbol.clone())),
            _ => {
                // Surface unknown symbols even though the offset is zero
                self.to_si_factor()?;
                Ok(0.0)
            }
        }
    }

    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut components = self.components.clone();
        for (symbol, exp) in &other.components {
            *components.entry(symbol.clone()).or_insert(0) += exp;
        }
        Self::from_components(components)
    }

    #[must_use]
    pub fn divide(&self, other: &Self) -> Self {
        self.multiply(&other.pow(-1))
    }

    #[must_use]
    pub fn pow(&self, exp: i32) -> Self {
        Self::from_components(
            self.components
                .iter()
                .map(|(k, v)| (k.clone(), v * exp))
                .collect(),
        )
    }

    /// Canonical string form: positive powers alphabetically, then `/`, then
    /// negative powers alphabetically.
    #[must_use]
    pub fn normalized(&self) -> String {
        let render = |positive: bool| -> String {
            self.components
                .iter()
                .filter(|(_, e)| (**e > 0) == positive)
                .map(|(s, &e)| match e.abs() {
                    1 => s.clone(),
                    n => format!("{s}^{n}"),
                })
                .collect::<Vec<_>>()
                .join(" ")
        };

        let numerator = render(true);
        let denominator = render(false);
        match (numerator.is_empty(), denominator.is_empty()) {
            (true, true) => "1".to_string(),
            (false, true) => numerator,
            (true, false) => format!("1 / {denominator}"),
            (false, false) => format!("{numerator} / {denominator}"),
        }
    }
}

impl fmt::Display for ParsedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Symbol(String),
    /// A literal `1`, as in `1 / s`.
    One,
    Exponent(i32),
    Times,
    Divide,
    Open,
    Close,
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '%'
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '/' => {
                tokens.push(Token::Divide);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                let (exp, next) = read_exponent(&chars, i)?;
                tokens.push(Token::Exponent(exp));
                i = next;
            }
            '*' | '\u{00B7}' => {
                tokens.push(Token::Times);
                i += 1;
            }
            '^' => {
                let (exp, next) = read_exponent(&chars, i + 1)?;
                tokens.push(Token::Exponent(exp));
                i = next;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '-' => {
                // Bare digits directly after a symbol or ')' are an implicit exponent
                let (exp, next) = read_exponent(&chars, i)?;
                match tokens.last() {
                    Some(Token::Symbol(_)) | Some(Token::Close) => {
                        tokens.push(Token::Exponent(exp))
                    }
                    _ if exp == 1 => tokens.push(Token::One),
                    _ => return Err(ParseError::UnexpectedChar(c)),
                }
                i = next;
            }
            c if is_symbol_char(c) => {
                let start = i;
                while i < chars.len() && is_symbol_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word.eq_ignore_ascii_case("per") {
                    tokens.push(Token::Divide);
                } else {
                    tokens.push(Token::Symbol(word));
                }
            }
            other => return Err(ParseError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

fn read_exponent(chars: &[char], start: usize) -> Result<(i32, usize), ParseError> {
    let mut i = start;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    let digits_start = i;
    if chars.get(i) == Some(&'-') {
        i += 1;
    }
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let text: String = chars[digits_start..i].iter().collect();
    text.parse()
        .map(|exp| (exp, i))
        .map_err(|_| ParseError::InvalidExponent(text))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<ParsedUnit, ParseError> {
        let mut result = self.term()?;
        while self.peek() == Some(&Token::Divide) {
            self.bump();
            result = result.divide(&self.term()?);
        }
        Ok(result)
    }

    fn term(&mut self) -> Result<ParsedUnit, ParseError> {
        let mut result = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Times) => {
                    self.bump();
                    result = result.multiply(&self.factor()?);
                }
                Some(Token::Symbol(_)) | Some(Token::Open) | Some(Token::One) => {
                    result = result.multiply(&self.factor()?);
                }
                _ => return Ok(result),
            }
        }
    }

    fn factor(&mut self) -> Result<ParsedUnit, ParseError> {
        let base = match self.bump() {
            Some(Token::Symbol(symbol)) => ParsedUnit::symbol(symbol, 1),
            Some(Token::One) => ParsedUnit::dimensionless(),
            Some(Token::Open) => {
                let inner = self.expression()?;
                if self.bump() != Some(Token::Close) {
                    return Err(ParseError::ParseFailed(
                        "missing closing parenthesis".into(),
                    ));
                }
                inner
            }
            Some(other) => {
                return Err(ParseError::ParseFailed(format!(
                    "expected unit symbol, found {other:?}"
                )))
            }
            None => return Err(ParseError::ParseFailed("expected unit symbol".into())),
        };

        if let Some(Token::Exponent(exp)) = self.peek().cloned() {
            self.bump();
            return Ok(base.pow(exp));
        }
        Ok(base)
    }
}
