use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0, u32 as dec_u32},
    combinator::{all_consuming, map, opt},
    multi::many0,
    sequence::{delimited, preceded},
};

use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, ErrorKind, Result};
use crate::query::ast::{QryIop, QrySop};

const KNOWN_FIELDS: [&str; 5] = ["body", "title", "url", "keywords", "inlink"];

/// Structured query parser.
///
/// Syntax: `#OP( arg ... )` with optional `/k` distance on NEAR and WINDOW,
/// bare tokens as terms, an optional `.field` suffix on terms, and
/// weight-operand alternation inside #WAND / #WSUM. Operator names are
/// case-insensitive. Examples:
/// - `#and( apple banana.title )`
/// - `#near/2( low cost )`
/// - `#wand( 0.7 #and( a b ) 0.3 c )`
///
/// Terms run through the analyzer: stopwords vanish (inside weighted
/// operators their weight vanishes with them) and a token that analyzes
/// into several terms contributes one TERM node each.
pub struct QueryParser {
    pub analyzer: Analyzer,
    pub default_field: String,
    pub fields: Vec<String>,
}

/// Syntax tree before analysis and operator checking.
enum RawNode {
    Op { name: String, distance: Option<u32>, args: Vec<RawNode> },
    Token(String),
}

impl QueryParser {
    pub fn new(analyzer: Analyzer) -> Self {
        QueryParser {
            analyzer,
            default_field: "body".to_string(),
            fields: KNOWN_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn with_default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = field.into();
        self
    }

    /// Parse a query string into an operator tree rooted at a SOP.
    pub fn parse(&self, query: &str) -> Result<QrySop> {
        let (_, raw) = all_consuming(delimited(multispace0, raw_expr, multispace0))
            .parse(query)
            .map_err(|err| {
                Error::new(ErrorKind::Parse, format!("query syntax error: {:?}", err))
            })?;
        match raw {
            op @ RawNode::Op { .. } => self.build_sop(op),
            tok @ RawNode::Token(_) => {
                let mut terms = self.build_sop_args(vec![tok])?;
                if terms.len() == 1 {
                    Ok(terms.remove(0))
                } else {
                    Err(Error::malformed(
                        "a bare query must analyze to a single term; wrap it in an operator",
                    ))
                }
            }
        }
    }

    fn build_sop(&self, raw: RawNode) -> Result<QrySop> {
        let RawNode::Op { name, distance, args } = raw else {
            return Err(Error::malformed("expected an operator"));
        };
        match name.as_str() {
            "near" | "window" => Ok(QrySop::score(self.build_iop(&name, distance, args)?)),
            "and" | "or" | "sum" => {
                require_no_distance(&name, distance)?;
                let children = self.build_sop_args(args)?;
                Ok(match name.as_str() {
                    "and" => QrySop::and(children),
                    "or" => QrySop::or(children),
                    _ => QrySop::sum(children),
                })
            }
            "wand" | "wsum" => {
                require_no_distance(&name, distance)?;
                let (weights, children) = self.build_weighted_args(&name, args)?;
                Ok(if name == "wand" {
                    QrySop::wand(weights, children)
                } else {
                    QrySop::wsum(weights, children)
                })
            }
            _ => Err(Error::malformed(format!("unknown operator #{}", name))),
        }
    }

    /// Children of a scoring operator. Terms become SCORE-wrapped TERM
    /// nodes; positional operators are SCORE-wrapped whole.
    fn build_sop_args(&self, args: Vec<RawNode>) -> Result<Vec<QrySop>> {
        let mut out = Vec::new();
        for arg in args {
            match arg {
                RawNode::Token(tok) => {
                    for (term, field) in self.analyze_token(&tok) {
                        out.push(QrySop::score(QryIop::term(term, field)));
                    }
                }
                op @ RawNode::Op { .. } => out.push(self.build_sop(op)?),
            }
        }
        Ok(out)
    }

    /// Weight-operand alternation: the token in weight position must be a
    /// non-negative number; the following node is its operand. An operand
    /// analyzing to several terms repeats the weight; one analyzing to
    /// nothing drops it.
    fn build_weighted_args(
        &self,
        name: &str,
        args: Vec<RawNode>,
    ) -> Result<(Vec<f64>, Vec<QrySop>)> {
        let mut weights = Vec::new();
        let mut children = Vec::new();
        let mut pending: Option<f64> = None;
        for arg in args {
            match pending {
                None => {
                    let RawNode::Token(tok) = arg else {
                        return Err(Error::malformed(format!(
                            "#{} requires a weight before each operand",
                            name
                        )));
                    };
                    let weight: f64 = tok.parse().map_err(|_| {
                        Error::malformed(format!("#{} weight is not a number: {:?}", name, tok))
                    })?;
                    if weight < 0.0 {
                        return Err(Error::malformed(format!(
                            "#{} weight must be non-negative, got {}",
                            name, weight
                        )));
                    }
                    pending = Some(weight);
                }
                Some(weight) => {
                    for child in self.build_sop_args(vec![arg])? {
                        weights.push(weight);
                        children.push(child);
                    }
                    pending = None;
                }
            }
        }
        if pending.is_some() {
            return Err(Error::malformed(format!("#{} has a weight with no operand", name)));
        }
        Ok((weights, children))
    }

    fn build_iop(&self, name: &str, distance: Option<u32>, args: Vec<RawNode>) -> Result<QryIop> {
        let distance = distance
            .ok_or_else(|| Error::malformed(format!("#{} requires a /k distance", name)))?;
        if distance == 0 {
            return Err(Error::malformed(format!("#{} distance must be at least 1", name)));
        }
        let children = self.build_iop_args(name, args)?;
        Ok(if name == "near" {
            QryIop::near(distance, children)
        } else {
            QryIop::window(distance, children)
        })
    }

    /// Children of a positional operator must themselves produce positions.
    fn build_iop_args(&self, parent: &str, args: Vec<RawNode>) -> Result<Vec<QryIop>> {
        let mut out = Vec::new();
        for arg in args {
            match arg {
                RawNode::Token(tok) => {
                    for (term, field) in self.analyze_token(&tok) {
                        out.push(QryIop::term(term, field));
                    }
                }
                RawNode::Op { name, distance, args } => match name.as_str() {
                    "near" | "window" => out.push(self.build_iop(&name, distance, args)?),
                    _ => {
                        return Err(Error::malformed(format!(
                            "#{} cannot appear inside #{}",
                            name, parent
                        )));
                    }
                },
            }
        }
        Ok(out)
    }

    /// Split an optional `.field` suffix, then analyze the remainder.
    fn analyze_token(&self, token: &str) -> Vec<(String, String)> {
        let (text, field) = match token.rsplit_once('.') {
            Some((head, tail)) if !head.is_empty() && self.is_known_field(tail) => {
                (head, tail.to_ascii_lowercase())
            }
            _ => (token, self.default_field.clone()),
        };
        self.analyzer
            .analyze(text)
            .into_iter()
            .map(|t| (t.text, field.clone()))
            .collect()
    }

    fn is_known_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.eq_ignore_ascii_case(name))
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        QueryParser::new(Analyzer::standard_english())
    }
}

fn require_no_distance(name: &str, distance: Option<u32>) -> Result<()> {
    if distance.is_some() {
        return Err(Error::malformed(format!("#{} does not take a /k distance", name)));
    }
    Ok(())
}

fn raw_expr(input: &str) -> IResult<&str, RawNode> {
    alt((raw_op, raw_token)).parse(input)
}

fn raw_op(input: &str) -> IResult<&str, RawNode> {
    let (input, _) = char('#').parse(input)?;
    let (input, name) = take_while1(|c: char| c.is_ascii_alphabetic()).parse(input)?;
    let (input, distance) = opt(preceded(char('/'), dec_u32)).parse(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('(').parse(input)?;
    let (input, args) = many0(preceded(multispace0, raw_expr)).parse(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')').parse(input)?;
    Ok((input, RawNode::Op { name: name.to_ascii_lowercase(), distance, args }))
}

fn raw_token(input: &str) -> IResult<&str, RawNode> {
    map(
        take_while1(|c: char| !c.is_whitespace() && !matches!(c, '(' | ')' | '#')),
        |tok: &str| RawNode::Token(tok.to_string()),
    )
    .parse(input)
}
