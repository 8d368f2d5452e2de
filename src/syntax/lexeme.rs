/// All lexemes of the kernel-body language (a Rust closure subset).
#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    // Keywords
    Let,
    Mut,
    If,
    Else,
    For,
    In,
    While,
    Loop,
    Break,
    Continue,
    Return,
    As,
    Move,
    True,
    False,

    // Symbols
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]
    Comma,      // ,
    Colon,      // :
    ColonColon, // ::
    Semicolon,  // ;
    Dot,        // .
    DotDot,     // ..
    DotDotEq,   // ..=
    Pipe,       // |
    PipePipe,   // ||
    Amp,        // &
    AmpAmp,     // &&
    Caret,      // ^
    Bang,       // !
    BangEq,     // !=
    Eq,         // =
    EqEq,       // ==
    Lt,         // <
    Le,         // <=
    Gt,         // >
    Ge,         // >=
    Shl,        // <<
    Shr,        // >>
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    PlusEq,     // +=
    MinusEq,    // -=
    StarEq,     // *=
    SlashEq,    // /=
    PercentEq,  // %=
    AmpEq,      // &=
    PipeEq,     // |=
    CaretEq,    // ^=
    ShlEq,      // <<=
    ShrEq,      // >>=

    // Literals. `text` is the literal as written minus its suffix.
    Integer { text: String, suffix: Option<String> },
    Float { text: String, suffix: Option<String> },
    Ident(String),

    // End of input
    Eof,
}

impl Lexeme {
    /// Try to match an identifier string to a keyword lexeme.
    pub fn from_keyword(s: &str) -> Option<Lexeme> {
        match s {
            "let" => Some(Lexeme::Let),
            "mut" => Some(Lexeme::Mut),
            "if" => Some(Lexeme::If),
            "else" => Some(Lexeme::Else),
            "for" => Some(Lexeme::For),
            "in" => Some(Lexeme::In),
            "while" => Some(Lexeme::While),
            "loop" => Some(Lexeme::Loop),
            "break" => Some(Lexeme::Break),
            "continue" => Some(Lexeme::Continue),
            "return" => Some(Lexeme::Return),
            "as" => Some(Lexeme::As),
            "move" => Some(Lexeme::Move),
            "true" => Some(Lexeme::True),
            "false" => Some(Lexeme::False),
            _ => None,
        }
    }

    /// Human-readable description for parser error messages.
    pub fn description(&self) -> String {
        match self {
            Lexeme::Let => "'let'".into(),
            Lexeme::Mut => "'mut'".into(),
            Lexeme::If => "'if'".into(),
            Lexeme::Else => "'else'".into(),
            Lexeme::For => "'for'".into(),
            Lexeme::In => "'in'".into(),
            Lexeme::While => "'while'".into(),
            Lexeme::Loop => "'loop'".into(),
            Lexeme::Break => "'break'".into(),
            Lexeme::Continue => "'continue'".into(),
            Lexeme::Return => "'return'".into(),
            Lexeme::As => "'as'".into(),
            Lexeme::Move => "'move'".into(),
            Lexeme::True => "'true'".into(),
            Lexeme::False => "'false'".into(),
            Lexeme::LParen => "'('".into(),
            Lexeme::RParen => "')'".into(),
            Lexeme::LBrace => "'{'".into(),
            Lexeme::RBrace => "'}'".into(),
            Lexeme::LBracket => "'['".into(),
            Lexeme::RBracket => "']'".into(),
            Lexeme::Comma => "','".into(),
            Lexeme::Colon => "':'".into(),
            Lexeme::ColonColon => "'::'".into(),
            Lexeme::Semicolon => "';'".into(),
            Lexeme::Dot => "'.'".into(),
            Lexeme::DotDot => "'..'".into(),
            Lexeme::DotDotEq => "'..='".into(),
            Lexeme::Pipe => "'|'".into(),
            Lexeme::PipePipe => "'||'".into(),
            Lexeme::Amp => "'&'".into(),
            Lexeme::AmpAmp => "'&&'".into(),
            Lexeme::Caret => "'^'".into(),
            Lexeme::Bang => "'!'".into(),
            Lexeme::BangEq => "'!='".into(),
            Lexeme::Eq => "'='".into(),
            Lexeme::EqEq => "'=='".into(),
            Lexeme::Lt => "'<'".into(),
            Lexeme::Le => "'<='".into(),
            Lexeme::Gt => "'>'".into(),
            Lexeme::Ge => "'>='".into(),
            Lexeme::Shl => "'<<'".into(),
            Lexeme::Shr => "'>>'".into(),
            Lexeme::Plus => "'+'".into(),
            Lexeme::Minus => "'-'".into(),
            Lexeme::Star => "'*'".into(),
            Lexeme::Slash => "'/'".into(),
            Lexeme::Percent => "'%'".into(),
            Lexeme::PlusEq => "'+='".into(),
            Lexeme::MinusEq => "'-='".into(),
            Lexeme::StarEq => "'*='".into(),
            Lexeme::SlashEq => "'/='".into(),
            Lexeme::PercentEq => "'%='".into(),
            Lexeme::AmpEq => "'&='".into(),
            Lexeme::PipeEq => "'|='".into(),
            Lexeme::CaretEq => "'^='".into(),
            Lexeme::ShlEq => "'<<='".into(),
            Lexeme::ShrEq => "'>>='".into(),
            Lexeme::Integer { text, .. } => format!("integer literal '{}'", text),
            Lexeme::Float { text, .. } => format!("float literal '{}'", text),
            Lexeme::Ident(s) => format!("identifier '{}'", s),
            Lexeme::Eof => "end of input".into(),
        }
    }
}
