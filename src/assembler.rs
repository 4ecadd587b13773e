//! Two-pass assembler: labels first, then table-driven encoding.
//!
//! Errors never stop a pass. Every problem is collected so one report lists
//! them all, and any error fails the whole assembly.

use tracing::{debug, warn};

use crate::instructions::{self, scatter, FieldRule, InstructionShape, LINK_LOW_HALF};
use crate::report::{AsmError, Diagnostic, ErrorReport};
use crate::symbols::SymbolTable;

/// Start of a line comment.
pub const COMMENT: char = '@';

#[derive(Debug, Clone, Copy)]
struct Statement<'a> {
    line_no: usize,
    text: &'a str,
}

/// Output of one assembly run, successful or not.
#[derive(Debug, Clone)]
pub struct AssembledProgram {
    pub words: Vec<u16>,
    pub diagnostics: Vec<Diagnostic>,
    pub symbols: SymbolTable,
    /// Statements left after removing comments and blank lines.
    pub lines: usize,
}

impl AssembledProgram {
    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn into_result(self) -> Result<Vec<u16>, ErrorReport> {
        if self.diagnostics.is_empty() {
            return Ok(self.words);
        }
        Err(ErrorReport {
            lines: self.lines,
            symbols: self.symbols.len(),
            instructions: self.words.len(),
            diagnostics: self.diagnostics,
        })
    }
}

/// Assemble `source` into 16-bit words, or report every error found.
pub fn assemble(source: &str) -> Result<Vec<u16>, ErrorReport> {
    assemble_program(source).into_result()
}

/// Run both passes and keep the words even when diagnostics were recorded.
pub fn assemble_program(source: &str) -> AssembledProgram {
    Assembler::new(source).run()
}

/// Canonical comma-joined form: the first whitespace run becomes a comma,
/// all other whitespace is dropped.
pub fn normalize(text: &str) -> String {
    let t = text.trim();
    match t.find(char::is_whitespace) {
        Some(i) => {
            let (mnemonic, rest) = t.split_at(i);
            let rest: String = rest.split_whitespace().collect();
            format!("{mnemonic},{rest}")
        }
        None => t.to_string(),
    }
}

/// Shape key of a normalized statement: digits removed, lowercased.
pub fn shape_key(statement: &str) -> String {
    statement
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Decimal literals in left-to-right order. Values too large for u32 saturate
/// so the range check rejects them.
pub fn numerics(statement: &str) -> Vec<u32> {
    statement
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse::<u32>().unwrap_or(u32::MAX))
        .collect()
}

fn split_label(text: &str) -> (Option<&str>, &str) {
    match text.split_once(':') {
        Some((label, rest)) => (Some(label), rest),
        None => (None, text),
    }
}

struct Assembler<'a> {
    statements: Vec<Statement<'a>>,
    symbols: SymbolTable,
    words: Vec<u16>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Assembler<'a> {
    fn new(source: &'a str) -> Self {
        let statements = source
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let code = line.split(COMMENT).next().unwrap_or_default().trim();
                (!code.is_empty()).then_some(Statement { line_no: i + 1, text: code })
            })
            .collect();
        Self {
            statements,
            symbols: SymbolTable::new(),
            words: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self) -> AssembledProgram {
        self.build_symbols();
        for i in 0..self.statements.len() {
            let st = self.statements[i];
            self.encode(st);
        }
        debug!(
            lines = self.statements.len(),
            words = self.words.len(),
            errors = self.diagnostics.len(),
            "assembly finished"
        );
        AssembledProgram {
            lines: self.statements.len(),
            words: self.words,
            diagnostics: self.diagnostics,
            symbols: self.symbols,
        }
    }

    /// Pass 1: one slot per statement that carries an instruction. A label on
    /// its own line waits for the next such statement.
    fn build_symbols(&mut self) {
        let mut pending = String::new();
        for st in &self.statements {
            let (label, rest) = split_label(st.text);
            if let Some(label) = label {
                pending = label.split_whitespace().collect();
                if rest.trim().is_empty() {
                    continue;
                }
            }
            self.symbols.push(std::mem::take(&mut pending));
        }
    }

    /// Pass 2: encode one statement into one or two words.
    fn encode(&mut self, st: Statement<'a>) {
        let (_, rest) = split_label(st.text);
        let stmt = normalize(rest);
        if stmt.is_empty() {
            return;
        }
        let key = shape_key(&stmt);
        let Some(shape) = instructions::lookup(&key) else {
            self.report(st, AsmError::UnsupportedInstruction);
            return;
        };
        debug!(line = st.line_no, %key, opcode = shape.opcode, "statement");

        let numbers = numerics(&stmt);
        match shape.fields {
            [rule] if rule.is_branch() => self.encode_branch(st, &stmt, shape, *rule),
            [FieldRule::RegisterList, ..] => {
                let Some((&base, regs)) = numbers.split_first() else {
                    self.report(st, AsmError::UnsupportedInstruction);
                    return;
                };
                let list = self.fold_list(st, regs);
                self.encode_fields(st, shape, vec![list, base]);
            }
            [FieldRule::RegisterListWithFlag] => {
                let lower = stmt.to_ascii_lowercase();
                let flag = lower.contains("pc") || lower.contains("lr");
                let list = self.fold_list(st, &numbers) | (u32::from(flag) << 8);
                self.encode_fields(st, shape, vec![list]);
            }
            _ => self.encode_fields(st, shape, numbers),
        }
    }

    fn encode_fields(&mut self, st: Statement<'a>, shape: &InstructionShape, mut values: Vec<u32>) {
        if values.len() > shape.fields.len() {
            self.report(st, AsmError::UnsupportedInstruction);
            return;
        }
        // implicit operand, e.g. `bx lr`
        if values.is_empty() {
            if let Some(field) = shape.fields.first() {
                values.push(field.limit());
            }
        }
        let mut word = shape.opcode;
        for (&value, field) in values.iter().zip(shape.fields) {
            let encoded = self.check_operand(st, value, field);
            word = scatter(word, encoded, field.mask());
        }
        self.words.push(word);
    }

    /// Validate one operand and return its field value; out-of-range values
    /// are reported but still encoded.
    fn check_operand(&mut self, st: Statement<'a>, value: u32, field: &FieldRule) -> u16 {
        let scale = u32::from(field.scale());
        if value % scale != 0 {
            self.report(
                st,
                AsmError::MisalignedOperand {
                    value,
                    scale: field.scale(),
                },
            );
        } else if value > field.limit() {
            self.report(
                st,
                AsmError::OperandOutOfRange {
                    value,
                    limit: field.limit(),
                },
            );
        }
        (value / scale) as u16
    }

    fn fold_list(&mut self, st: Statement<'a>, regs: &[u32]) -> u32 {
        let mut bits = 0u32;
        for &r in regs {
            if r > 7 {
                self.report(st, AsmError::OperandOutOfRange { value: r, limit: 7 });
                continue;
            }
            bits |= 1 << r;
        }
        bits
    }

    fn encode_branch(&mut self, st: Statement<'a>, stmt: &str, shape: &InstructionShape, rule: FieldRule) {
        let Some(label) = stmt.split(',').nth(1).filter(|l| !l.is_empty()) else {
            self.report(st, AsmError::UnsupportedInstruction);
            return;
        };
        let Some(target) = self.symbols.find(label) else {
            self.report(st, AsmError::SymbolNotFound(label.to_string()));
            self.words.push(shape.opcode);
            return;
        };
        let here = self.words.len() as i64;
        let delta = target as i64 - here;
        let mask = rule.mask();

        match rule {
            FieldRule::LinkBranch => {
                // Labels after this point have not been shifted by the blank
                // slot yet, hence the asymmetric bias.
                let offset = if delta <= 0 { delta - 2 } else { delta - 1 };
                self.check_branch(st, offset, 22);
                let high = ((offset >> 11) & 0x7ff) as u16;
                let low = (offset & 0x7ff) as u16;
                self.words.push(scatter(shape.opcode, high, mask));
                self.symbols.insert_blank(self.words.len());
                self.words.push(scatter(shape.opcode | LINK_LOW_HALF, low, mask));
            }
            FieldRule::LongBranch => {
                let offset = delta - 2;
                self.check_branch(st, offset, 11);
                self.words.push(scatter(shape.opcode, offset as u16, mask));
            }
            _ => {
                let offset = delta - 2;
                self.check_branch(st, offset, 8);
                self.words.push(scatter(shape.opcode, offset as u16, mask));
            }
        }
    }

    fn check_branch(&mut self, st: Statement<'a>, offset: i64, bits: u32) {
        let reach = 1i64 << (bits - 1);
        if offset < -reach || offset >= reach {
            self.report(
                st,
                AsmError::BranchOutOfRange {
                    offset: offset as i32,
                },
            );
        }
    }

    fn report(&mut self, st: Statement<'a>, error: AsmError) {
        warn!(line = st.line_no, %error, "{}", st.text);
        self.diagnostics.push(Diagnostic {
            line_no: st.line_no,
            line: st.text.to_string(),
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_joins_operands_with_commas() {
        assert_eq!(normalize("  mov r1, #255 "), "mov,r1,#255");
        assert_eq!(normalize("push {r1, r2, lr}"), "push,{r1,r2,lr}");
        assert_eq!(normalize("ldr\tr0, [r1, #4]"), "ldr,r0,[r1,#4]");
        assert_eq!(normalize("bx lr"), "bx,lr");
    }

    #[test]
    fn shape_key_drops_digits() {
        assert_eq!(shape_key("mov,r1,#255"), "mov,r,#");
        assert_eq!(shape_key("LDR,R0,[SP,#4]"), "ldr,r,[sp,#]");
        assert_eq!(numerics("ldr,r0,[r1,#12]"), vec![0, 1, 12]);
    }

    #[test]
    fn oversized_literal_saturates() {
        assert_eq!(numerics("mov,r1,#99999999999"), vec![1, u32::MAX]);
    }
}
