use color_print::cformat;
use mlarch::Op;

use crate::assembler::Program;

/// Listing of the assembled program: address and bytes of every emitted
/// word next to its source line, followed by the symbol table.
pub fn dump(file: &str, listing: &str, program: &Program) -> String {
    let mut out = format!(
        "{}+------[{}]{}\n",
        "-".repeat(20),
        file,
        "-".repeat(45usize.saturating_sub(file.len()))
    );
    let mut rows = program.rows.iter().peekable();

    for (idx, text) in listing.lines().enumerate() {
        let line_num = idx + 1;
        let source = colorize(text);

        let mut first = true;
        while let Some(row) = rows.next_if(|row| row.line == line_num) {
            let bytes = program.image.as_bytes()[row.addr..row.addr + 4]
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ");
            let body = match (first, row.insn) {
                (_, Some(_)) => match Op::from_bin(program.image.word(row.addr as u32)) {
                    Ok(op) => op.cformat(),
                    Err(_) => cformat!("<r,s>{}</>", text.trim()),
                },
                (true, None) => source.clone(),
                (false, None) => String::new(),
            };
            let num = if first {
                format!("{:>4}:", line_num)
            } else {
                format!("{:5}", "")
            };
            out.push_str(&format!("[{:05x}] {} | {}   {}\n", row.addr, bytes, num, body));
            first = false;
        }
        if first {
            out.push_str(&format!("{:20}| {:>4}:   {}\n", "", line_num, source));
        }
    }

    out.push_str(&format!("{}+{}\n", "-".repeat(20), "-".repeat(53)));
    for (name, sym) in program.symbols.iter() {
        if let Some(position) = sym.position {
            out.push_str(&cformat!(
                "<g>{:<19}</> | 0x{:05x} ({} refs)\n",
                name,
                position,
                sym.actions.len()
            ));
        }
    }
    out
}

fn colorize(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("//") || trimmed.starts_with('#') {
        cformat!("<dim>{}</>", trimmed)
    } else if trimmed.starts_with('.') {
        cformat!("<c>{}</>", trimmed)
    } else if trimmed.ends_with(':') {
        cformat!("<g>{}</>", trimmed)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_follow_source() {
        let listing = ".code\nstart:\nCall sub\nReturn\n.data\n1 2 3 4 5 6 7 8\n.code\nsub:\nReturn\n";
        let program = Program::assemble(listing).unwrap();
        let text = dump("test.s", listing, &program);
        assert!(text.contains("[00000] 01 00 08 00 |    3:"));
        assert!(text.contains("[00004] 02 00 00 00 |    4:"));
        assert!(text.contains("[00008] 01 02 03 04 |    6:"));
        assert!(text.contains("[0000c] 05 06 07 08 |      "));
        assert!(text.contains("[00010] 02 00 00 00 |    9:"));
        assert!(text.contains("0x00010 (1 refs)"));
    }
}
