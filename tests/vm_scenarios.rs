use tapec::runtime::{UNDERFLOW_EXIT_STATUS, UNDERFLOW_MESSAGE};
use tapec::vm::Machine;
use tapec::{lower_source, run_source, CompileError, ParseError};

struct Outcome {
    status: i32,
    output: Vec<u8>,
    errors: Vec<u8>,
    cells: Vec<u8>,
    pointer: usize,
}

fn execute(source: &str, input: &str) -> Outcome {
    let module = lower_source("scenario", source).unwrap();
    let mut vm = Machine::new(input.as_bytes(), Vec::new(), Vec::new()).with_step_limit(1_000_000);
    let status = vm.run(&module).unwrap();
    let tape = vm.tape().unwrap();
    let cells = tape.cells().to_vec();
    let pointer = tape.pointer();
    let (output, errors) = vm.into_parts();
    Outcome {
        status,
        output,
        errors,
        cells,
        pointer,
    }
}

#[test]
fn merged_increments_set_the_first_cell() {
    let outcome = execute("++++", "");
    assert_eq!(outcome.status, 0);
    assert_eq!(outcome.cells, vec![4, 0, 0, 0]);
}

#[test]
fn loop_body_runs_until_the_cell_is_zero() {
    let outcome = execute("+[-]", "");
    assert_eq!(outcome.status, 0);
    assert_eq!(outcome.cells[0], 0);

    let outcome = execute("+++++[>++<-]", "");
    assert_eq!(&outcome.cells[..2], &[0, 10]);
}

#[test]
fn skipped_loop_body_never_runs() {
    let outcome = execute("[+>+]+", "");
    assert_eq!(outcome.cells, vec![1, 0, 0, 0]);
    assert_eq!(outcome.pointer, 0);
}

#[test]
fn unmatched_loops_are_parse_errors() {
    match lower_source("bad", "[") {
        Err(err @ CompileError::Parse(ParseError::NoLoopEnd)) => {
            assert_eq!(err.to_string(), "Parsing Error: Loop was not ended!");
        }
        other => panic!("unexpected {other:?}"),
    }
    match lower_source("bad", "]") {
        Err(err @ CompileError::Parse(ParseError::NoLoopStart)) => {
            assert_eq!(err.to_string(), "Parsing Error: Loop was not started!");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn left_move_at_cell_zero_aborts_with_diagnostic() {
    let outcome = execute("<+", "");
    assert_eq!(outcome.status, UNDERFLOW_EXIT_STATUS);
    assert_ne!(outcome.status, 0);
    assert_eq!(outcome.errors, UNDERFLOW_MESSAGE.as_bytes());
    // Nothing after the guard ran.
    assert_eq!(outcome.cells, vec![0, 0, 0, 0]);
}

#[test]
fn underflow_after_output_keeps_earlier_output() {
    let outcome = execute("+++++++++++++++++++++++++++++++++.><<", "");
    assert_eq!(outcome.status, 1);
    assert_eq!(outcome.output, b"!");
    assert_eq!(outcome.errors, UNDERFLOW_MESSAGE.as_bytes());
}

#[test]
fn first_input_after_refill_is_the_byte_at_offset_one() {
    // The line is "A\n"; the read advances past 'A' before fetching.
    let outcome = execute(",.", "A\n");
    assert_eq!(outcome.output, b"\n");
    assert_eq!(outcome.cells[0], b'\n');
}

#[test]
fn consecutive_inputs_walk_the_line() {
    let outcome = execute(",.,.,.", "ABC\n");
    assert_eq!(outcome.output, b"BC\n");
}

#[test]
fn end_of_line_yields_zero_then_the_next_line() {
    // "ab\n": 'b', '\n', then 0 at the end, then "cd\n" from offset 1.
    let outcome = execute(",.,.,.,.", "ab\ncd\n");
    assert_eq!(outcome.output, vec![b'b', b'\n', 0, b'd']);
}

#[test]
fn exhausted_input_reads_zero() {
    let outcome = execute(",.,.", "");
    assert_eq!(outcome.output, vec![0, 0]);
    assert_eq!(outcome.status, 0);
}

#[test]
fn echo_loop_stops_at_end_of_line() {
    let outcome = execute(",[.,]", "hi\n");
    assert_eq!(outcome.output, b"i\n");
}

#[test]
fn tape_grows_by_doubling_and_preserves_cells() {
    let source = format!("+{}+", ">".repeat(9));
    let outcome = execute(&source, "");
    assert_eq!(outcome.cells.len(), 16);
    assert_eq!(outcome.pointer, 9);
    assert_eq!(outcome.cells[0], 1);
    assert_eq!(outcome.cells[9], 1);
    assert_eq!(outcome.cells.iter().filter(|&&cell| cell != 0).count(), 2);

    for steps in [3usize, 4, 7, 8, 100] {
        let outcome = execute(&">".repeat(steps), "");
        let capacity = outcome.cells.len();
        assert!(capacity.is_power_of_two() && capacity >= 4);
        assert!(outcome.pointer < capacity, "pointer {} capacity {capacity}", outcome.pointer);
        assert!(capacity / 2 <= steps || capacity == 4);
    }
}

#[test]
fn cell_arithmetic_wraps() {
    let outcome = execute("-", "");
    assert_eq!(outcome.cells[0], 255);
    let outcome = execute(&"+".repeat(300), "");
    assert_eq!(outcome.cells[0], 44);
}

#[test]
fn hello_world() {
    let source = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
    let mut output = Vec::new();
    let mut errors = Vec::new();
    let status = run_source(source, &b""[..], &mut output, &mut errors).unwrap();
    assert_eq!(status, 0);
    assert_eq!(String::from_utf8(output).unwrap(), "Hello World!\n");
    assert!(errors.is_empty());
}
