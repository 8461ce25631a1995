use std::f64::consts::{E, PI};
use thiserror::Error;

/// Anything that can turn a line of text into a single number.
pub trait Evaluator {
    fn evaluate(&self, expression: &str) -> Result<f64, EvalError>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown character '{0}'")]
    UnknownCharacter(char),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("missing closing parenthesis")]
    MissingParen,
    #[error("unexpected tokens at end of expression")]
    TrailingInput,
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("{0}")]
    Domain(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("expression nested too deeply")]
    TooDeep,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Op(char),
    Ident(String),
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("'{}'", n),
            Token::Op(c) => format!("'{}'", c),
            Token::Ident(name) => format!("'{}'", name),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            _ if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            '+' | '-' | '*' | '/' | '^' | '%' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                let mut has_dot = false;
                let mut has_exp = false;

                while let Some(&ch) = chars.peek() {
                    match ch {
                        '.' if has_dot || has_exp => break,
                        '.' => {
                            has_dot = true;
                            num_str.push(ch);
                            chars.next();
                        }
                        'e' | 'E' if !has_exp => {
                            has_exp = true;
                            num_str.push(ch);
                            chars.next();

                            if let Some(&sign) = chars.peek() {
                                if sign == '+' || sign == '-' {
                                    num_str.push(sign);
                                    chars.next();
                                }
                            }
                        }
                        '0'..='9' => {
                            num_str.push(ch);
                            chars.next();
                        }
                        _ => break,
                    }
                }

                let value = num_str
                    .parse::<f64>()
                    .map_err(|_| EvalError::InvalidNumber(num_str.clone()))?;
                tokens.push(Token::Number(value));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(EvalError::UnknownCharacter(c)),
        }
    }
    Ok(tokens)
}

// Bounds recursion through parentheses, call arguments and `^`.
const MAX_DEPTH: usize = 256;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0, depth: 0 }
    }

    pub fn parse(&mut self) -> Result<f64, EvalError> {
        let result = self.expr()?;
        if self.current < self.tokens.len() {
            return Err(EvalError::TrailingInput);
        }
        Ok(result)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn nested<T>(&mut self, rule: fn(&mut Self) -> Result<T, EvalError>) -> Result<T, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut left = self.term()?;

        loop {
            match self.peek() {
                Some(Token::Op('+')) => {
                    self.current += 1;
                    left += self.term()?;
                }
                Some(Token::Op('-')) => {
                    self.current += 1;
                    left -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut left = self.unary()?;

        loop {
            match self.peek() {
                Some(Token::Op('*')) => {
                    self.current += 1;
                    left *= self.unary()?;
                }
                Some(Token::Op('/')) => {
                    self.current += 1;
                    let right = self.unary()?;
                    if right == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    left /= right;
                }
                Some(Token::Op('%')) => {
                    self.current += 1;
                    let right = self.unary()?;
                    if right == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    left %= right;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<f64, EvalError> {
        let mut sign = 1.0;

        loop {
            match self.peek() {
                Some(Token::Op('+')) => self.current += 1,
                Some(Token::Op('-')) => {
                    sign = -sign;
                    self.current += 1;
                }
                _ => break,
            }
        }

        Ok(sign * self.power()?)
    }

    // Right associative: 2^3^2 == 2^9.
    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.primary()?;

        if self.eat(&Token::Op('^')) {
            let exponent = self.nested(Self::unary)?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        let token = self.peek().cloned().ok_or(EvalError::UnexpectedEnd)?;
        self.current += 1;

        match token {
            Token::Number(n) => Ok(n),
            Token::LParen => {
                let value = self.nested(Self::expr)?;
                if self.eat(&Token::RParen) {
                    Ok(value)
                } else if self.peek().is_none() {
                    Err(EvalError::MissingParen)
                } else {
                    Err(EvalError::UnexpectedToken(self.tokens[self.current].describe()))
                }
            }
            Token::Ident(ident) => {
                let name = ident.to_lowercase();
                match name.as_str() {
                    "pi" => return Ok(PI),
                    "e" => return Ok(E),
                    _ => {}
                }

                if !self.eat(&Token::LParen) {
                    return Err(EvalError::UnknownFunction(name));
                }
                let args = self.nested(Self::arguments)?;
                call_function(&name, &args)
            }
            other => Err(EvalError::UnexpectedToken(other.describe())),
        }
    }

    // Called after the opening parenthesis has been consumed.
    fn arguments(&mut self) -> Result<Vec<f64>, EvalError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }

        loop {
            args.push(self.expr()?);
            match self.peek() {
                Some(Token::Comma) => self.current += 1,
                Some(Token::RParen) => {
                    self.current += 1;
                    return Ok(args);
                }
                Some(other) => return Err(EvalError::UnexpectedToken(other.describe())),
                None => return Err(EvalError::MissingParen),
            }
        }
    }
}

fn expect_args(name: &str, args: &[f64], count: usize) -> Result<(), EvalError> {
    if args.len() == count {
        return Ok(());
    }
    Err(EvalError::Arity {
        name: name.to_string(),
        expected: count.to_string(),
        got: args.len(),
    })
}

fn expect_some(name: &str, args: &[f64]) -> Result<(), EvalError> {
    if args.is_empty() {
        return Err(EvalError::Arity {
            name: name.to_string(),
            expected: "at least 1".to_string(),
            got: 0,
        });
    }
    Ok(())
}

fn call_function(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    let domain = |msg: &str| Err(EvalError::Domain(msg.to_string()));

    match name {
        "min" | "max" | "sum" | "avg" | "mean" => {
            expect_some(name, args)?;
            let value = match name {
                "min" => args.iter().copied().fold(f64::INFINITY, f64::min),
                "max" => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                "sum" => args.iter().sum(),
                _ => args.iter().sum::<f64>() / args.len() as f64,
            };
            Ok(value)
        }
        "root" | "pow" => {
            expect_args(name, args, 2)?;
            let (x, n) = (args[0], args[1]);
            if name == "pow" {
                return Ok(x.powf(n));
            }
            if n == 0.0 {
                return domain("root degree cannot be zero");
            }
            if x < 0.0 {
                // Odd integer roots of negatives are real.
                if n.fract() == 0.0 && n % 2.0 != 0.0 {
                    return Ok(-(-x).powf(1.0 / n));
                }
                return domain("even root of negative number");
            }
            Ok(x.powf(1.0 / n))
        }
        "fact" | "factorial" => {
            expect_args(name, args, 1)?;
            let n = args[0];
            if n < 0.0 || n.fract() != 0.0 {
                return domain("factorial requires a non-negative integer");
            }
            let mut result: f64 = 1.0;
            let mut i = 2.0;
            while i <= n && result.is_finite() {
                result *= i;
                i += 1.0;
            }
            Ok(result)
        }
        _ => {
            let f: fn(f64) -> f64 = match name {
                "abs" => f64::abs,
                "sqrt" => f64::sqrt,
                "exp" => f64::exp,
                "ln" => f64::ln,
                "log" | "log10" => f64::log10,
                "sin" => f64::sin,
                "cos" => f64::cos,
                "tan" => f64::tan,
                "asin" => f64::asin,
                "acos" => f64::acos,
                "atan" => f64::atan,
                "sinh" => f64::sinh,
                "cosh" => f64::cosh,
                "tanh" => f64::tanh,
                "floor" => f64::floor,
                "ceil" => f64::ceil,
                "round" => f64::round,
                _ => return Err(EvalError::UnknownFunction(name.to_string())),
            };
            expect_args(name, args, 1)?;
            let x = args[0];
            match name {
                "sqrt" if x < 0.0 => domain("sqrt domain: non-negative numbers"),
                "ln" | "log" | "log10" if x <= 0.0 => domain("log domain: positive numbers"),
                "asin" | "acos" if !(-1.0..=1.0).contains(&x) => domain("arc sine/cosine domain: [-1, 1]"),
                _ => Ok(f(x)),
            }
        }
    }
}

/// The bundled arithmetic evaluator.
#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }
}

impl Evaluator for Engine {
    fn evaluate(&self, expression: &str) -> Result<f64, EvalError> {
        let tokens = tokenize(expression)?;
        Parser::new(tokens).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> Result<f64, EvalError> {
        Engine::new().evaluate(s)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(eval("3+5*(2-8)"), Ok(-27.0));
        assert_eq!(eval("3+3"), Ok(6.0));
        assert_eq!(eval("10 - 4 - 3"), Ok(3.0));
        assert_eq!(eval("2*3+4*5"), Ok(26.0));
        assert_eq!(eval("7 % 3"), Ok(1.0));
        assert_eq!(eval("1/4"), Ok(0.25));
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_minus() {
        assert_eq!(eval("2^3^2"), Ok(512.0));
        assert_eq!(eval("-2^2"), Ok(-4.0));
        assert_eq!(eval("2^-1"), Ok(0.5));
        assert_eq!(eval("--3"), Ok(3.0));
    }

    #[test]
    fn numbers_with_exponents() {
        assert_eq!(eval("1.5e3"), Ok(1500.0));
        assert_eq!(eval("2E-2*100"), Ok(2.0));
        assert_eq!(eval(".5+.5"), Ok(1.0));
    }

    #[test]
    fn constants_and_functions() {
        assert!(close(eval("pi").unwrap(), PI));
        assert!(close(eval("E").unwrap(), E));
        assert!(close(eval("sin(pi/2)").unwrap(), 1.0));
        assert_eq!(eval("sqrt(16)"), Ok(4.0));
        assert!(close(eval("root(27, 3)").unwrap(), 3.0));
        assert!(close(eval("root(-8, 3)").unwrap(), -2.0));
        assert_eq!(eval("max(1, 7, 3)"), Ok(7.0));
        assert_eq!(eval("avg(1, 2, 3, 4)"), Ok(2.5));
        assert_eq!(eval("fact(5)"), Ok(120.0));
        assert_eq!(eval("round(2.5) + floor(-1.5)"), Ok(1.0));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(eval(""), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("   "), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("3+*"), Err(EvalError::UnexpectedToken("'*'".to_string())));
        assert_eq!(eval("(("), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("(1+2"), Err(EvalError::MissingParen));
        assert_eq!(eval("1 2"), Err(EvalError::TrailingInput));
        assert_eq!(eval("2 $ 3"), Err(EvalError::UnknownCharacter('$')));
        assert!(matches!(eval("not an expr"), Err(EvalError::UnknownFunction(_))));
        assert!(matches!(eval("1.2.3"), Err(EvalError::TrailingInput)));
    }

    #[test]
    fn rejects_bad_calls() {
        assert_eq!(eval("foo(1)"), Err(EvalError::UnknownFunction("foo".to_string())));
        assert!(matches!(eval("sqrt(1, 2)"), Err(EvalError::Arity { got: 2, .. })));
        assert!(matches!(eval("min()"), Err(EvalError::Arity { got: 0, .. })));
        assert!(matches!(eval("sqrt(-1)"), Err(EvalError::Domain(_))));
        assert!(matches!(eval("ln(0)"), Err(EvalError::Domain(_))));
        assert!(matches!(eval("fact(2.5)"), Err(EvalError::Domain(_))));
        assert!(matches!(eval("root(-16, 2)"), Err(EvalError::Domain(_))));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_eq!(eval("1e"), Err(EvalError::InvalidNumber("1e".to_string())));
        assert_eq!(eval("2e+ 1"), Err(EvalError::InvalidNumber("2e+".to_string())));
        assert_eq!(eval("."), Err(EvalError::InvalidNumber(".".to_string())));
        assert_eq!(eval("3 * ."), Err(EvalError::InvalidNumber(".".to_string())));
    }

    #[test]
    fn arity_message_names_the_expected_count() {
        let err = eval("pow(2)").unwrap_err();
        assert_eq!(err.to_string(), "pow expects 2 argument(s), got 1");
        let err = eval("sqrt(1, 2, 3)").unwrap_err();
        assert_eq!(err.to_string(), "sqrt expects 1 argument(s), got 3");
        let err = eval("max()").unwrap_err();
        assert_eq!(err.to_string(), "max expects at least 1 argument(s), got 0");
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |levels: usize| format!("{}1{}", "(".repeat(levels), ")".repeat(levels));
        assert_eq!(eval(&nested(200)), Ok(1.0));
        assert_eq!(eval(&nested(300)), Err(EvalError::TooDeep));
        assert_eq!(eval(&nested(200_000)), Err(EvalError::TooDeep));

        let calls = format!("{}1{}", "abs(".repeat(300), ")".repeat(300));
        assert_eq!(eval(&calls), Err(EvalError::TooDeep));

        let tower = format!("{}1", "1^".repeat(300));
        assert_eq!(eval(&tower), Err(EvalError::TooDeep));
        assert_eq!(eval(&format!("{}1", "1^".repeat(100))), Ok(1.0));
    }

    #[test]
    fn depth_resets_between_siblings() {
        let group = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        let sum = vec![group; 10].join("+");
        assert_eq!(eval(&sum), Ok(10.0));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(eval("1/0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("5 % (2-2)"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let engine = Engine::new();
        for input in ["3+5*(2-8)", "3+*", "sin(1)"] {
            assert_eq!(engine.evaluate(input), engine.evaluate(input));
        }
    }
}
