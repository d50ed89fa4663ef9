use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    analyzer::AnnotatedProgram,
    parser::{Assignment, Block, Declaration, Expr, FunctionDecl, LValue, StackPush, Stmt},
};

use super::{Instruction, Operand};

/// Lowers an analysed program to three-address code.
///
/// Temporaries (`t0, t1, ..`) and labels (`L0, L1, ..`) are numbered per
/// `generate` call. Temporaries skip every name the program declares.
///
/// Each declaration gets its own name in the output: the first `x` stays
/// `x`, later ones become `x.1`, `x.2`, .. so shadowing never clobbers.
pub struct Codegen {
    temp_index: usize,
    label_index: usize,
    code: Vec<Instruction>,
    /// Source name to output name, innermost scope last.
    scopes: Vec<HashMap<String, String>>,
    declared: HashMap<String, usize>,
    reserved: HashSet<String>,
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}

impl Codegen {
    pub fn new() -> Self {
        Self {
            temp_index: 0,
            label_index: 0,
            code: vec![],
            scopes: vec![HashMap::new()],
            declared: HashMap::new(),
            reserved: HashSet::new(),
        }
    }

    pub fn generate(&mut self, program: &AnnotatedProgram) -> Vec<Instruction> {
        self.temp_index = 0;
        self.label_index = 0;
        self.code.clear();
        self.scopes = vec![HashMap::new()];
        self.declared.clear();
        self.reserved = program
            .declarations
            .iter()
            .map(|symbol| symbol.name.clone())
            .collect();

        for stmt in program.program.0.iter() {
            self.gen_stmt(stmt);
        }
        debug!(
            "generated {} instructions using {} temps and {} labels",
            self.code.len(),
            self.temp_index,
            self.label_index
        );
        std::mem::take(&mut self.code)
    }

    fn new_temp(&mut self) -> String {
        loop {
            let s = format!("t{}", self.temp_index);
            self.temp_index += 1;
            if !self.reserved.contains(&s) {
                return s;
            }
        }
    }

    fn new_label(&mut self) -> String {
        let s = format!("L{}", self.label_index);
        self.label_index += 1;
        s
    }

    fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Picks the output name for a new declaration of `name`.
    fn fresh_name(&mut self, name: &str) -> String {
        let count = self.declared.entry(name.to_string()).or_insert(0);
        let fresh = match *count {
            0 => name.to_string(),
            n => format!("{name}.{n}"),
        };
        *count += 1;
        fresh
    }

    fn bind(&mut self, name: &str, fresh: String) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), fresh);
        }
    }

    fn declare(&mut self, name: &str) -> String {
        let fresh = self.fresh_name(name);
        self.bind(name, fresh.clone());
        fresh
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    fn resolve(&self, name: &str) -> String {
        self.lookup(name).unwrap_or_else(|| name.to_string())
    }

    fn gen_block(&mut self, block: &Block) {
        for stmt in block.0.iter() {
            self.gen_stmt(stmt);
        }
    }

    fn gen_scoped_block(&mut self, block: &Block) {
        self.enter_scope();
        self.gen_block(block);
        self.exit_scope();
    }

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If(cond, then_block, else_block) => {
                self.gen_if(cond, then_block, else_block.as_ref())
            }
            Stmt::While(cond, body) => self.gen_while(cond, body),
            Stmt::DoWhile(body, cond) => self.gen_do_while(body, cond),
            Stmt::For(init, cond, update, body) => self.gen_for(init, cond, update, body),
            Stmt::FunctionDecl(f) => self.gen_function_decl(f),
            Stmt::Declaration(d) => self.gen_declaration(d),
            Stmt::Assign(a) => self.gen_assignment(a),
            Stmt::StackPush(p) => self.gen_stack_push(p),
            Stmt::Expr(Expr::Call(ident, args)) => {
                let argc = self.gen_args(args);
                self.emit(Instruction::Call {
                    dest: None,
                    name: self.resolve(&ident.name),
                    argc,
                });
            }
            Stmt::Expr(Expr::StackPop(ident)) => {
                self.emit(Instruction::Param(Operand::Name(self.resolve(&ident.name))));
                self.emit(Instruction::Call {
                    dest: None,
                    name: "pop".to_string(),
                    argc: 1,
                });
            }
            Stmt::Expr(expr) => {
                self.gen_expr(expr);
            }
        }
    }

    /// The false path falls through into the else code, then jumps past the
    /// then code.
    fn gen_if(&mut self, cond: &Expr, then_block: &Block, else_block: Option<&Block>) {
        let cond = self.gen_expr(cond);
        let true_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instruction::CondGoto {
            cond,
            label: true_label.clone(),
        });
        if let Some(else_block) = else_block {
            self.gen_scoped_block(else_block);
        }
        // also without an else branch, or the false path runs the then code
        self.emit(Instruction::Goto(end_label.clone()));
        self.emit(Instruction::Label(true_label));
        self.gen_scoped_block(then_block);
        self.emit(Instruction::Label(end_label));
    }

    fn gen_while(&mut self, cond: &Expr, body: &Block) {
        let begin_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instruction::Label(begin_label.clone()));
        let cond = self.gen_expr(cond);
        self.emit(Instruction::CondGotoFalse {
            cond,
            label: end_label.clone(),
        });
        self.gen_scoped_block(body);
        self.emit(Instruction::Goto(begin_label));
        self.emit(Instruction::Label(end_label));
    }

    fn gen_do_while(&mut self, body: &Block, cond: &Expr) {
        let begin_label = self.new_label();

        self.emit(Instruction::Label(begin_label.clone()));
        self.gen_scoped_block(body);
        let cond = self.gen_expr(cond);
        self.emit(Instruction::CondGoto {
            cond,
            label: begin_label,
        });
    }

    /// The header and the body share one scope.
    fn gen_for(&mut self, init: &Assignment, cond: &Expr, update: &Assignment, body: &Block) {
        self.enter_scope();
        self.gen_assignment(init);

        let begin_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instruction::Label(begin_label.clone()));
        let cond = self.gen_expr(cond);
        self.emit(Instruction::CondGotoFalse {
            cond,
            label: end_label.clone(),
        });
        self.gen_block(body);
        self.gen_assignment(update);
        self.emit(Instruction::Goto(begin_label));
        self.emit(Instruction::Label(end_label));
        self.exit_scope();
    }

    /// The function's own name only becomes visible after its body.
    fn gen_function_decl(&mut self, f: &FunctionDecl) {
        let name = self.fresh_name(&f.name.name);
        self.emit(Instruction::FuncBegin(name.clone()));

        self.enter_scope();
        for param in f.params.iter() {
            let param = self.declare(&param.name.name);
            self.emit(Instruction::Load(param));
        }

        self.gen_block(&f.body);
        let value = match &f.ret {
            Some(expr) => self.gen_expr(expr),
            None => Operand::Number("0".to_string()),
        };
        self.emit(Instruction::Return(value));
        self.exit_scope();

        self.emit(Instruction::FuncEnd(name.clone()));
        self.bind(&f.name.name, name);
    }

    fn gen_declaration(&mut self, d: &Declaration) {
        let src = d.init.as_ref().map(|init| self.gen_expr(init));
        let dest = self.declare(&d.name.name);
        if let Some(src) = src {
            self.emit(Instruction::Copy { dest, src });
        }
    }

    /// Assigning to a name that is not in scope declares it.
    fn gen_assignment(&mut self, a: &Assignment) {
        match &a.target {
            LValue::Ident(ident) => {
                let src = self.gen_expr(&a.expr);
                let dest = match self.lookup(&ident.name) {
                    Some(dest) => dest,
                    None => self.declare(&ident.name),
                };
                self.emit(Instruction::Copy { dest, src });
            }
            LValue::Index(ident, index) => {
                let index = self.gen_expr(index);
                let src = self.gen_expr(&a.expr);
                self.emit(Instruction::IndexStore {
                    base: self.resolve(&ident.name),
                    index,
                    src,
                });
            }
        }
    }

    fn gen_stack_push(&mut self, p: &StackPush) {
        let value = self.gen_expr(&p.value);
        self.emit(Instruction::Param(Operand::Name(self.resolve(&p.stack.name))));
        self.emit(Instruction::Param(value));
        self.emit(Instruction::Call {
            dest: None,
            name: "push".to_string(),
            argc: 2,
        });
    }

    /// Arguments are all evaluated before the first `param`.
    fn gen_args(&mut self, args: &[Expr]) -> usize {
        let args: Vec<_> = args.iter().map(|arg| self.gen_expr(arg)).collect();
        let argc = args.len();
        for arg in args {
            self.emit(Instruction::Param(arg));
        }
        argc
    }

    /// Emits the code computing `expr` and returns where its value lives.
    fn gen_expr(&mut self, expr: &Expr) -> Operand {
        match expr {
            Expr::Literal(l) => Operand::from(l),
            Expr::Ident(ident) => Operand::Name(self.resolve(&ident.name)),
            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.gen_expr(left);
                let right = self.gen_expr(right);
                let dest = self.new_temp();
                self.emit(Instruction::Assign {
                    dest: dest.clone(),
                    left,
                    op: *op,
                    right,
                });
                Operand::Name(dest)
            }
            Expr::Index(ident, index) => {
                let index = self.gen_expr(index);
                let dest = self.new_temp();
                self.emit(Instruction::IndexLoad {
                    dest: dest.clone(),
                    base: self.resolve(&ident.name),
                    index,
                });
                Operand::Name(dest)
            }
            Expr::Call(ident, args) => {
                let argc = self.gen_args(args);
                let dest = self.new_temp();
                self.emit(Instruction::Call {
                    dest: Some(dest.clone()),
                    name: self.resolve(&ident.name),
                    argc,
                });
                Operand::Name(dest)
            }
            Expr::StackPop(ident) => {
                self.emit(Instruction::Param(Operand::Name(self.resolve(&ident.name))));
                let dest = self.new_temp();
                self.emit(Instruction::Call {
                    dest: Some(dest.clone()),
                    name: "pop".to_string(),
                    argc: 1,
                });
                Operand::Name(dest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SemanticVisitor;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn analyze(s: &str) -> AnnotatedProgram {
        let tokens = Lexer::tokenize(s).unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        SemanticVisitor::new().visit_program(program).unwrap()
    }

    fn tac(s: &str) -> Vec<String> {
        Codegen::new()
            .generate(&analyze(s))
            .iter()
            .map(|i| i.to_string())
            .collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            tac("x = 2 + 3 * 4;"),
            vec!["t0 = 3 * 4", "t1 = 2 + t0", "x = t1"]
        );
        assert_eq!(
            tac("x = (2 + 3) * 4 - 1;"),
            vec!["t0 = 2 + 3", "t1 = t0 * 4", "t2 = t1 - 1", "x = t2"]
        );
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            tac("a = 1; b = 2; if (a == b) { y = 1; } else { y = 2; }"),
            vec![
                "a = 1",
                "b = 2",
                "t0 = a == b",
                "if t0 goto L0",
                "y = 2",
                "goto L1",
                "L0:",
                "y = 1",
                "L1:",
            ]
        );
    }

    #[test]
    fn test_if_without_else_skips_then_branch() {
        assert_eq!(
            tac("a = 1; if (a > 0) { a = 0; }"),
            vec![
                "a = 1",
                "t0 = a > 0",
                "if t0 goto L0",
                "goto L1",
                "L0:",
                "a = 0",
                "L1:",
            ]
        );
    }

    #[test]
    fn test_while() {
        assert_eq!(
            tac("i = 0; while (i < 10) { i = i + 1; }"),
            vec![
                "i = 0",
                "L0:",
                "t0 = i < 10",
                "if not t0 goto L1",
                "t1 = i + 1",
                "i = t1",
                "goto L0",
                "L1:",
            ]
        );
    }

    #[test]
    fn test_do_while() {
        assert_eq!(
            tac("n = 3; do { n = n - 1; } while (n);"),
            vec!["n = 3", "L0:", "t0 = n - 1", "n = t0", "if n goto L0"]
        );
    }

    #[test]
    fn test_for() {
        assert_eq!(
            tac("s = 0; for (i = 0; i < 3; i = i + 1) { s = s + i; }"),
            vec![
                "s = 0",
                "i = 0",
                "L0:",
                "t0 = i < 3",
                "if not t0 goto L1",
                "t1 = s + i",
                "s = t1",
                "t2 = i + 1",
                "i = t2",
                "goto L0",
                "L1:",
            ]
        );
    }

    #[test]
    fn test_nested_labels_are_unique() {
        let code = tac("x = 1; while (x) { if (x) { x = 0; } }");
        let labels: Vec<_> = code.iter().filter(|l| l.ends_with(':')).collect();
        assert_eq!(labels, vec!["L0:", "L2:", "L3:", "L1:"]);
    }

    #[test]
    fn test_function() {
        assert_eq!(
            tac("def add(a, b) { c = a + b; return c; } r = add(1, 2);"),
            vec![
                "FUNC add",
                "LOAD a",
                "LOAD b",
                "t0 = a + b",
                "c = t0",
                "RETURN c",
                "END_FUNC add",
                "param 1",
                "param 2",
                "t1 = call add, 2",
                "r = t1",
            ]
        );
    }

    #[test]
    fn test_function_without_return() {
        assert_eq!(
            tac("def f() { x = 1; } f();"),
            vec!["FUNC f", "x = 1", "RETURN 0", "END_FUNC f", "call f, 0"]
        );
    }

    #[test]
    fn test_call_arguments_evaluated_before_params() {
        assert_eq!(
            tac("def f(a, b) { return a; } x = 1; y = f(x + 1, x * 2);")[5..],
            [
                "x = 1",
                "t0 = x + 1",
                "t1 = x * 2",
                "param t0",
                "param t1",
                "t2 = call f, 2",
                "y = t2",
            ]
        );
    }

    #[test]
    fn test_arrays_and_stacks() {
        assert_eq!(
            tac("a: array<int>; s: stack<string>; a[0] = a[1] + 2; s.push(\"v\"); w = s.pop();"),
            vec![
                "t0 = a[1]",
                "t1 = t0 + 2",
                "a[0] = t1",
                "param s",
                "param \"v\"",
                "call push, 2",
                "param s",
                "t2 = call pop, 1",
                "w = t2",
            ]
        );
    }

    #[test]
    fn test_declaration_with_initializer() {
        assert_eq!(tac("x: float; y: float = 1.5;"), vec!["y = 1.5"]);
    }

    #[test]
    fn test_temps_skip_declared_names() {
        assert_eq!(
            tac("t0 = 5; x = 1 + 2; y = t0;"),
            vec!["t0 = 5", "t1 = 1 + 2", "x = t1", "y = t0"]
        );
    }

    #[test]
    fn test_shadowing_declaration_keeps_outer_variable() {
        assert_eq!(
            tac("x = 1; if (x) { x: string = \"s\"; } y = x + 1;"),
            vec![
                "x = 1",
                "if x goto L0",
                "goto L1",
                "L0:",
                "x.1 = \"s\"",
                "L1:",
                "t0 = x + 1",
                "y = t0",
            ]
        );
    }

    #[test]
    fn test_parameter_shadowing_global() {
        assert_eq!(
            tac("x = 1; def f(x) { return x * 2; } y = f(x);"),
            vec![
                "x = 1",
                "FUNC f",
                "LOAD x.1",
                "t0 = x.1 * 2",
                "RETURN t0",
                "END_FUNC f",
                "param x",
                "t1 = call f, 1",
                "y = t1",
            ]
        );
    }

    #[test]
    fn test_mutation_in_block_writes_outer_variable() {
        assert_eq!(
            tac("n = 0; while (n < 2) { n = n + 1; m: int = n; }")[4..6],
            ["t1 = n + 1", "n = t1"]
        );
        let code = tac("a = 1; if (a) { b: int = 2; } if (a) { b: int = 3; }");
        assert!(code.contains(&"b = 2".to_string()));
        assert!(code.contains(&"b.1 = 3".to_string()));
    }

    #[test]
    fn test_counters_reset_between_runs() {
        let program = analyze("x = 1; if (x < 2) { x = x + 1; }");
        let mut codegen = Codegen::new();
        let first = codegen.generate(&program);
        let second = codegen.generate(&program);
        assert_eq!(first, second);
        assert_eq!(second[1].to_string(), "t0 = x < 2");
    }
}
