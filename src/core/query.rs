//! Metadata query language.
//!
//! A query has an optional stem part and an optional `where` part:
//!
//! ```text
//! infant & antibiotics where age_days < 30
//! ```
//!
//! The stem part combines words with `&` (intersection), `|` (union) and
//! `-` (difference); words placed side by side are intersected. Precedence
//! from tightest to loosest is `-`, `&`, `|`, and parentheses group. Every
//! word is reduced to its Porter stem before lookup.
//!
//! The `where` part holds comparisons on metadata categories joined with
//! `and`, `or` and `not`:
//!
//! ```text
//! where (age_days >= 30 or sex == 'female') and country in ('USA', 'Canada')
//! ```

use crate::core::stem::stem;
use crate::utils::error::{RedbiomError, Result};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataQuery {
    pub stems: Option<StemExpr>,
    pub filter: Option<WhereExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StemExpr {
    Term(String),
    Union(Box<StemExpr>, Box<StemExpr>),
    Intersect(Box<StemExpr>, Box<StemExpr>),
    Difference(Box<StemExpr>, Box<StemExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WhereExpr {
    Compare {
        category: String,
        op: CompareOp,
        value: String,
    },
    In {
        category: String,
        values: Vec<String>,
    },
    And(Box<WhereExpr>, Box<WhereExpr>),
    Or(Box<WhereExpr>, Box<WhereExpr>),
    Not(Box<WhereExpr>),
}

/// Parses a full metadata query.
pub fn parse(query: &str) -> Result<MetadataQuery> {
    let (stem_part, where_part) = split_where(query);

    let stems = if stem_part.trim().is_empty() {
        None
    } else {
        Some(parse_stems(stem_part)?)
    };

    let filter = match where_part {
        Some(part) if part.trim().is_empty() => {
            return Err(RedbiomError::query("missing condition after 'where'"));
        }
        Some(part) => Some(parse_where(part)?),
        None => None,
    };

    if stems.is_none() && filter.is_none() {
        return Err(RedbiomError::query("empty query"));
    }

    Ok(MetadataQuery { stems, filter })
}

fn split_where(query: &str) -> (&str, Option<&str>) {
    static WHERE: OnceLock<Regex> = OnceLock::new();
    let re = WHERE.get_or_init(|| Regex::new(r"(?i)\bwhere\b").expect("valid pattern"));

    match re.find(query) {
        Some(m) => (&query[..m.start()], Some(&query[m.end()..])),
        None => (query, None),
    }
}

impl StemExpr {
    /// Collects the stems whose sets are needed to evaluate the expression.
    pub fn terms(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Term(term) => {
                out.insert(term.clone());
            }
            Self::Union(l, r) | Self::Intersect(l, r) | Self::Difference(l, r) => {
                l.terms(out);
                r.terms(out);
            }
        }
    }

    /// Evaluates against fetched sets; a stem missing from `sets` is empty.
    pub fn evaluate(&self, sets: &HashMap<String, BTreeSet<String>>) -> BTreeSet<String> {
        match self {
            Self::Term(term) => sets.get(term).cloned().unwrap_or_default(),
            Self::Union(l, r) => {
                let mut left = l.evaluate(sets);
                left.extend(r.evaluate(sets));
                left
            }
            Self::Intersect(l, r) => {
                let left = l.evaluate(sets);
                if left.is_empty() {
                    return left;
                }
                let right = r.evaluate(sets);
                left.intersection(&right).cloned().collect()
            }
            Self::Difference(l, r) => {
                let left = l.evaluate(sets);
                let right = r.evaluate(sets);
                left.difference(&right).cloned().collect()
            }
        }
    }
}

impl WhereExpr {
    /// Collects the categories referenced anywhere in the expression.
    pub fn categories(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Compare { category, .. } | Self::In { category, .. } => {
                out.insert(category.clone());
            }
            Self::And(l, r) | Self::Or(l, r) => {
                l.categories(out);
                r.categories(out);
            }
            Self::Not(inner) => inner.categories(out),
        }
    }

    /// Samples satisfying the expression.
    ///
    /// `values` maps category to (sample to value). `not` is taken relative to
    /// every sample present in any referenced category.
    pub fn evaluate(&self, values: &HashMap<String, HashMap<String, String>>) -> BTreeSet<String> {
        let mut referenced = BTreeSet::new();
        self.categories(&mut referenced);
        let universe: BTreeSet<String> = referenced
            .iter()
            .filter_map(|category| values.get(category))
            .flat_map(|samples| samples.keys().cloned())
            .collect();
        self.evaluate_within(values, &universe)
    }

    fn evaluate_within(
        &self,
        values: &HashMap<String, HashMap<String, String>>,
        universe: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        let matching = |category: &str, pred: &dyn Fn(&str) -> bool| -> BTreeSet<String> {
            values
                .get(category)
                .map(|samples| {
                    samples
                        .iter()
                        .filter(|(_, value)| pred(value.as_str()))
                        .map(|(sample, _)| sample.clone())
                        .collect()
                })
                .unwrap_or_default()
        };

        match self {
            Self::Compare {
                category,
                op,
                value,
            } => matching(category.as_str(), &|stored: &str| op.matches(stored, value)),
            Self::In {
                category,
                values: options,
            } => matching(category.as_str(), &|stored: &str| {
                options.iter().any(|v| CompareOp::Eq.matches(stored, v))
            }),
            Self::And(l, r) => {
                let left = l.evaluate_within(values, universe);
                let right = r.evaluate_within(values, universe);
                left.intersection(&right).cloned().collect()
            }
            Self::Or(l, r) => {
                let mut left = l.evaluate_within(values, universe);
                left.extend(r.evaluate_within(values, universe));
                left
            }
            Self::Not(inner) => {
                let excluded = inner.evaluate_within(values, universe);
                universe.difference(&excluded).cloned().collect()
            }
        }
    }
}

impl CompareOp {
    /// Numeric comparison when both sides are finite numbers; otherwise only
    /// `==` and `!=` apply, as plain string comparisons.
    pub fn matches(self, stored: &str, literal: &str) -> bool {
        let stored = stored.trim();
        match (as_number(stored), as_number(literal)) {
            (Some(a), Some(b)) => match self {
                Self::Eq => a == b,
                Self::Ne => a != b,
                Self::Lt => a < b,
                Self::Le => a <= b,
                Self::Gt => a > b,
                Self::Ge => a >= b,
            },
            _ => match self {
                Self::Eq => stored == literal,
                Self::Ne => stored != literal,
                _ => false,
            },
        }
    }
}

fn as_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(op)
    }
}

// ---------------------------------------------------------------------------
// Stem expressions

#[derive(Debug, Clone, PartialEq)]
enum StemToken {
    Word(String),
    And,
    Or,
    Minus,
    LParen,
    RParen,
}

impl fmt::Display for StemToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(w) => write!(f, "'{}'", w),
            Self::And => f.write_str("'&'"),
            Self::Or => f.write_str("'|'"),
            Self::Minus => f.write_str("'-'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
        }
    }
}

fn tokenize_stems(input: &str) -> Vec<StemToken> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        let token = match c {
            '&' => StemToken::And,
            '|' => StemToken::Or,
            '-' => StemToken::Minus,
            '(' => StemToken::LParen,
            ')' => StemToken::RParen,
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || "&|-()".contains(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
                if !word.is_empty() {
                    tokens.push(StemToken::Word(stem(word)));
                }
                continue;
            }
        };
        tokens.push(token);
        chars.next();
    }

    tokens
}

fn parse_stems(input: &str) -> Result<StemExpr> {
    let mut parser = StemParser {
        tokens: tokenize_stems(input),
        pos: 0,
    };
    let expr = parser.parse_union()?;
    if let Some(token) = parser.peek() {
        return Err(RedbiomError::query(format!("unexpected {}", token)));
    }
    Ok(expr)
}

struct StemParser {
    tokens: Vec<StemToken>,
    pos: usize,
}

impl StemParser {
    fn peek(&self) -> Option<&StemToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<StemToken> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_union(&mut self) -> Result<StemExpr> {
        let mut left = self.parse_intersection()?;
        while self.peek() == Some(&StemToken::Or) {
            self.advance();
            let right = self.parse_intersection()?;
            left = StemExpr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_intersection(&mut self) -> Result<StemExpr> {
        let mut left = self.parse_difference()?;
        loop {
            match self.peek() {
                Some(StemToken::And) => {
                    self.advance();
                }
                Some(StemToken::Word(_)) | Some(StemToken::LParen) => {}
                _ => break,
            }
            let right = self.parse_difference()?;
            left = StemExpr::Intersect(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_difference(&mut self) -> Result<StemExpr> {
        let mut left = self.parse_atom()?;
        while self.peek() == Some(&StemToken::Minus) {
            self.advance();
            let right = self.parse_atom()?;
            left = StemExpr::Difference(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<StemExpr> {
        match self.advance() {
            Some(StemToken::Word(word)) => Ok(StemExpr::Term(word)),
            Some(StemToken::LParen) => {
                let expr = self.parse_union()?;
                match self.advance() {
                    Some(StemToken::RParen) => Ok(expr),
                    _ => Err(RedbiomError::query("missing ')'")),
                }
            }
            Some(token) => Err(RedbiomError::query(format!(
                "expected a word or '(' but found {}",
                token
            ))),
            None => Err(RedbiomError::query("expected a word or '(' at end of query")),
        }
    }
}

// ---------------------------------------------------------------------------
// Where clauses

#[derive(Debug, Clone, PartialEq)]
enum WhereToken {
    Word(String),
    Quoted(String),
    Op(CompareOp),
    LParen,
    RParen,
    Comma,
}

impl WhereToken {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Self::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

impl fmt::Display for WhereToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(w) => write!(f, "'{}'", w),
            Self::Quoted(s) => write!(f, "\"{}\"", s),
            Self::Op(op) => write!(f, "'{}'", op),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::Comma => f.write_str("','"),
        }
    }
}

fn tokenize_where(input: &str) -> Result<Vec<WhereToken>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '(' => WhereToken::LParen,
            ')' => WhereToken::RParen,
            ',' => WhereToken::Comma,
            '\'' | '"' => {
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(q) if q == c => break,
                        Some(ch) => value.push(ch),
                        None => return Err(RedbiomError::query("unterminated string literal")),
                    }
                }
                WhereToken::Quoted(value)
            }
            '=' | '!' | '<' | '>' => {
                let followed_by_eq = chars.peek() == Some(&'=');
                if followed_by_eq {
                    chars.next();
                }
                let op = match (c, followed_by_eq) {
                    ('=', true) => CompareOp::Eq,
                    ('!', true) => CompareOp::Ne,
                    ('<', true) => CompareOp::Le,
                    ('>', true) => CompareOp::Ge,
                    ('<', false) => CompareOp::Lt,
                    ('>', false) => CompareOp::Gt,
                    _ => {
                        return Err(RedbiomError::query(format!(
                            "unknown operator '{}', comparisons use == != < <= > >=",
                            c
                        )))
                    }
                };
                WhereToken::Op(op)
            }
            _ => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || "(),'\"=!<>".contains(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                WhereToken::Word(word)
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn parse_where(input: &str) -> Result<WhereExpr> {
    let mut parser = WhereParser {
        tokens: tokenize_where(input)?,
        pos: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(RedbiomError::query(format!(
            "unexpected {} in where clause",
            token
        )));
    }
    Ok(expr)
}

struct WhereParser {
    tokens: Vec<WhereToken>,
    pos: usize,
}

impl WhereParser {
    fn peek(&self) -> Option<&WhereToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<WhereToken> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn parse_or(&mut self) -> Result<WhereExpr> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = WhereExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<WhereExpr> {
        let mut left = self.parse_not()?;
        while self.peek_keyword("and") {
            self.advance();
            let right = self.parse_not()?;
            left = WhereExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<WhereExpr> {
        if self.peek_keyword("not") {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(WhereExpr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<WhereExpr> {
        let category = match self.advance() {
            Some(WhereToken::LParen) => {
                let expr = self.parse_or()?;
                return match self.advance() {
                    Some(WhereToken::RParen) => Ok(expr),
                    _ => Err(RedbiomError::query("missing ')' in where clause")),
                };
            }
            Some(WhereToken::Word(word))
                if !["and", "or", "not", "in"]
                    .iter()
                    .any(|k| word.eq_ignore_ascii_case(k)) =>
            {
                word
            }
            Some(token) => {
                return Err(RedbiomError::query(format!(
                    "expected a category name but found {}",
                    token
                )))
            }
            None => {
                return Err(RedbiomError::query(
                    "expected a category name at end of where clause",
                ))
            }
        };

        match self.advance() {
            Some(WhereToken::Op(op)) => {
                let value = self.parse_value()?;
                Ok(WhereExpr::Compare {
                    category,
                    op,
                    value,
                })
            }
            Some(token) if token.is_keyword("in") => {
                if self.advance() != Some(WhereToken::LParen) {
                    return Err(RedbiomError::query("expected '(' after 'in'"));
                }
                let mut values = vec![self.parse_value()?];
                loop {
                    match self.advance() {
                        Some(WhereToken::Comma) => values.push(self.parse_value()?),
                        Some(WhereToken::RParen) => break,
                        _ => return Err(RedbiomError::query("missing ')' after 'in' values")),
                    }
                }
                Ok(WhereExpr::In { category, values })
            }
            _ => Err(RedbiomError::query(format!(
                "expected a comparison after '{}'",
                category
            ))),
        }
    }

    fn parse_value(&mut self) -> Result<String> {
        match self.advance() {
            Some(WhereToken::Word(word)) | Some(WhereToken::Quoted(word)) => Ok(word),
            Some(token) => Err(RedbiomError::query(format!(
                "expected a value but found {}",
                token
            ))),
            None => Err(RedbiomError::query("expected a value at end of where clause")),
        }
    }
}
