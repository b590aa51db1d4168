use aoc::ast::{Node, NodeKind, NodeValue};
use aoc::lexer::tokenize;
use aoc::parser::parse;
use aoc::types::TypeHandle;

fn parse_source(source: &str) -> Node {
    let mut cursor = tokenize(source).expect("tokenizes");
    parse(&mut cursor).expect("parses")
}

fn parse_error(source: &str) -> String {
    let mut cursor = tokenize(source).expect("tokenizes");
    parse(&mut cursor).unwrap_err().message
}

#[test]
fn every_successful_parse_has_a_module_root() {
    for source in [
        "",
        "print(1)\n",
        "let x = 1\nlet y = 2\n",
        "if x:\n    pass\n",
        "contract C:\n    pass\n",
    ] {
        let root = parse_source(source);
        assert!(
            root.is_kind(NodeKind::ModuleDefinition),
            "no module root for {:?}",
            source
        );
    }
}

#[test]
fn addition_dominates_multiplication() {
    let module = parse_source("a + b * c\n");
    let statement = &module.children[0];
    assert!(statement.is_kind(NodeKind::Addition));
    assert!(statement.children[1].is_kind(NodeKind::Multiplication));
}

#[test]
fn parenthesized_sum_binds_before_product() {
    let module = parse_source("let v = (5 + 2) * 2\n");
    let definition = &module.children[0];
    let product = &definition.children[1];
    assert!(product.is_kind(NodeKind::Multiplication));
    assert!(product.children[0].is_kind(NodeKind::Parentheses));
    assert!(product.children[0].children[0].is_kind(NodeKind::Addition));
}

#[test]
fn exponent_nests_to_the_right() {
    let module = parse_source("a ** b ** c\n");
    let outer = &module.children[0];
    assert!(outer.is_kind(NodeKind::Exponent));
    assert_eq!(outer.children[0].identifier(), Some("a"));
    let inner = &outer.children[1];
    assert!(inner.is_kind(NodeKind::Exponent));
    assert_eq!(inner.children[0].identifier(), Some("b"));
    assert_eq!(inner.children[1].identifier(), Some("c"));
}

#[test]
fn minus_is_unary_in_initializers_and_binary_between_operands() {
    let module = parse_source("let x = -5\n");
    assert!(module.children[0].children[1].is_kind(NodeKind::UnaryMinus));

    let module = parse_source("a - b\n");
    assert!(module.children[0].is_kind(NodeKind::Subtraction));
}

#[test]
fn elif_chain_nests_as_single_tail_children() {
    let source = "\
if a > b:
    print(1)
elif a != 0:
    print(2)
elif b == 4:
    print(3)
else:
    print(4)
";
    let module = parse_source(source);
    let chain = &module.children[0];
    assert!(chain.is_kind(NodeKind::StatementIf));

    let elif1 = chain.children.last().expect("if has a tail");
    assert!(elif1.is_kind(NodeKind::StatementElif));
    let elif2 = elif1.children.last().expect("first elif has a tail");
    assert!(elif2.is_kind(NodeKind::StatementElif));
    let tail = elif2.children.last().expect("second elif has a tail");
    assert!(tail.is_kind(NodeKind::StatementElse));

    // The else tail has no condition, only its body statement.
    assert_eq!(tail.children.len(), 1);
    assert!(tail.children[0].is_kind(NodeKind::Call));
}

#[test]
fn inline_suites_parse_like_indented_ones() {
    let inline = parse_source("if a: print(1)\nelse: print(2)\n");
    let indented = parse_source("if a:\n    print(1)\nelse:\n    print(2)\n");
    // Same shape, different source locations.
    assert_eq!(
        aoc::ast::printer::print(&inline.children[0]),
        aoc::ast::printer::print(&indented.children[0])
    );
}

#[test]
fn self_parameter_is_a_single_child_definition() {
    let module = parse_source("contract C:\n    def f(self):\n        pass\n");
    let contract = &module.children[0];
    assert!(contract.is_kind(NodeKind::ContractDefinition));
    assert_eq!(contract.children[0].identifier(), Some("C"));

    let function = &contract.children[1];
    assert!(function.is_kind(NodeKind::FunctionDefinition));
    let parameter = &function.children[1];
    assert!(parameter.is_kind(NodeKind::FunctionParameterDefinition));
    assert_eq!(parameter.children.len(), 1);
    assert_eq!(parameter.children[0].identifier(), Some("self"));
}

#[test]
fn function_definition_collects_parameters_and_return_type() {
    let module = parse_source("def sum(a: num, b: num) -> num:\n    return a + b\n");
    let function = &module.children[0];
    assert!(function.is_kind(NodeKind::FunctionDefinition));
    assert_eq!(function.children[0].identifier(), Some("sum"));

    let first = &function.children[1];
    assert!(first.is_kind(NodeKind::FunctionParameterDefinition));
    assert_eq!(first.children[0].identifier(), Some("a"));
    assert_eq!(first.children[1].type_id(), Some(TypeHandle::NUM));

    let second = &function.children[2];
    assert!(second.is_kind(NodeKind::FunctionParameterDefinition));

    assert_eq!(function.children[3].type_id(), Some(TypeHandle::NUM));
    assert!(function.children[4].is_kind(NodeKind::StatementReturn));
}

#[test]
fn variable_definition_with_annotation_and_initializer() {
    let module = parse_source("let supply: num = 100\n");
    let definition = &module.children[0];
    assert!(definition.is_kind(NodeKind::VariableDefinition));
    assert_eq!(definition.children.len(), 3);
    assert_eq!(definition.children[0].identifier(), Some("supply"));
    assert_eq!(definition.children[1].type_id(), Some(TypeHandle::NUM));
    assert_eq!(definition.children[2].value, NodeValue::Number(100));
}

#[test]
fn while_body_keeps_statement_order() {
    let module = parse_source("while i < 4:\n    print(i)\n    i += 1\n    assert i < 5\n");
    let loop_node = &module.children[0];
    assert!(loop_node.is_kind(NodeKind::StatementWhile));
    assert_eq!(loop_node.children.len(), 4);
    assert!(loop_node.children[0].is_kind(NodeKind::LessThan));
    assert!(loop_node.children[1].is_kind(NodeKind::Call));
    assert!(loop_node.children[2].is_kind(NodeKind::AssignAddition));
    assert!(loop_node.children[3].is_kind(NodeKind::StatementAssert));
}

#[test]
fn member_assignment_parses_member_access_first() {
    let module = parse_source("self.sum = 5\n");
    let assignment = &module.children[0];
    assert!(assignment.is_kind(NodeKind::Assign));
    assert!(assignment.children[0].is_kind(NodeKind::MemberCall));
    assert_eq!(assignment.children[1].value, NodeValue::Number(5));
}

#[test]
fn dedent_returns_statements_to_the_outer_scope() {
    let module = parse_source("if a:\n    print(1)\nprint(2)\n");
    assert_eq!(module.children.len(), 2);
    assert!(module.children[0].is_kind(NodeKind::StatementIf));
    assert!(module.children[1].is_kind(NodeKind::Call));
}

#[test]
fn boolean_literals_are_leaves() {
    let module = parse_source("let flag: bool = True\n");
    let definition = &module.children[0];
    assert_eq!(definition.children[2].value, NodeValue::Bool(true));
}

#[test]
fn missing_punctuation_names_the_expected_token() {
    assert!(parse_error("if x\n    pass\n").contains("missing ':'"));
    assert!(parse_error("def f(a: num:\n    pass\n").contains("',' or ')'"));
    assert!(parse_error("let x = (1\n").contains("',' or ')'"));
}

#[test]
fn empty_parentheses_require_an_expression() {
    assert_eq!(parse_error("let x = ()\n"), "Expected expression");
}

#[test]
fn stray_operand_is_a_syntax_error() {
    assert_eq!(parse_error("let x = 1 2\n"), "Syntax error");
}

#[test]
fn import_statement_takes_the_module_name() {
    let module = parse_source("import runtime\n");
    let import = &module.children[0];
    assert!(import.is_kind(NodeKind::StatementImport));
    assert_eq!(import.children[0].identifier(), Some("runtime"));
}
