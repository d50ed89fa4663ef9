use std::fmt;

use crate::parser::{BinOpKind, Literal, LiteralKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// A variable or a temporary.
    Name(String),
    Number(String),
    Str(String),
}

impl Operand {
    pub fn name(s: impl Into<String>) -> Self {
        Operand::Name(s.into())
    }
}

impl From<&Literal> for Operand {
    fn from(l: &Literal) -> Self {
        match l.kind {
            LiteralKind::Integer | LiteralKind::Float => Operand::Number(l.value.clone()),
            LiteralKind::String => Operand::Str(l.value.clone()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Name(s) | Operand::Number(s) => write!(f, "{s}"),
            Operand::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

/// One three-address code instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Assign {
        dest: String,
        left: Operand,
        op: BinOpKind,
        right: Operand,
    },
    Copy {
        dest: String,
        src: Operand,
    },
    IndexLoad {
        dest: String,
        base: String,
        index: Operand,
    },
    IndexStore {
        base: String,
        index: Operand,
        src: Operand,
    },
    CondGoto {
        cond: Operand,
        label: String,
    },
    CondGotoFalse {
        cond: Operand,
        label: String,
    },
    Goto(String),
    Label(String),
    Param(Operand),
    Call {
        dest: Option<String>,
        name: String,
        argc: usize,
    },
    Load(String),
    Return(Operand),
    FuncBegin(String),
    FuncEnd(String),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Assign {
                dest,
                left,
                op,
                right,
            } => write!(f, "{dest} = {left} {op} {right}"),
            Instruction::Copy { dest, src } => write!(f, "{dest} = {src}"),
            Instruction::IndexLoad { dest, base, index } => write!(f, "{dest} = {base}[{index}]"),
            Instruction::IndexStore { base, index, src } => write!(f, "{base}[{index}] = {src}"),
            Instruction::CondGoto { cond, label } => write!(f, "if {cond} goto {label}"),
            Instruction::CondGotoFalse { cond, label } => write!(f, "if not {cond} goto {label}"),
            Instruction::Goto(label) => write!(f, "goto {label}"),
            Instruction::Label(label) => write!(f, "{label}:"),
            Instruction::Param(arg) => write!(f, "param {arg}"),
            Instruction::Call {
                dest: Some(dest),
                name,
                argc,
            } => write!(f, "{dest} = call {name}, {argc}"),
            Instruction::Call {
                dest: None,
                name,
                argc,
            } => write!(f, "call {name}, {argc}"),
            Instruction::Load(param) => write!(f, "LOAD {param}"),
            Instruction::Return(value) => write!(f, "RETURN {value}"),
            Instruction::FuncBegin(name) => write!(f, "FUNC {name}"),
            Instruction::FuncEnd(name) => write!(f, "END_FUNC {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Instruction::Assign {
        dest: "t0".to_string(),
        left: Operand::name("a"),
        op: BinOpKind::Equal,
        right: Operand::Number("1".to_string()),
    }, "t0 = a == 1")]
    #[case(Instruction::Copy { dest: "s".to_string(), src: Operand::Str("hi".to_string()) }, "s = \"hi\"")]
    #[case(Instruction::IndexLoad {
        dest: "t1".to_string(),
        base: "arr".to_string(),
        index: Operand::name("i"),
    }, "t1 = arr[i]")]
    #[case(Instruction::IndexStore {
        base: "arr".to_string(),
        index: Operand::Number("0".to_string()),
        src: Operand::name("t1"),
    }, "arr[0] = t1")]
    #[case(Instruction::CondGoto { cond: Operand::name("t0"), label: "L0".to_string() }, "if t0 goto L0")]
    #[case(Instruction::CondGotoFalse { cond: Operand::name("t0"), label: "L1".to_string() }, "if not t0 goto L1")]
    #[case(Instruction::Goto("L1".to_string()), "goto L1")]
    #[case(Instruction::Label("L1".to_string()), "L1:")]
    #[case(Instruction::Param(Operand::Number("2.5".to_string())), "param 2.5")]
    #[case(Instruction::Call { dest: None, name: "print".to_string(), argc: 3 }, "call print, 3")]
    #[case(Instruction::Call { dest: Some("t2".to_string()), name: "f".to_string(), argc: 0 }, "t2 = call f, 0")]
    #[case(Instruction::Load("x".to_string()), "LOAD x")]
    #[case(Instruction::Return(Operand::name("result")), "RETURN result")]
    #[case(Instruction::FuncBegin("calc".to_string()), "FUNC calc")]
    #[case(Instruction::FuncEnd("calc".to_string()), "END_FUNC calc")]
    fn test_display(#[case] instruction: Instruction, #[case] expected: &str) {
        assert_eq!(instruction.to_string(), expected);
    }
}
