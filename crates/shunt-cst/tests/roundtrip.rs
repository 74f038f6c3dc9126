//! Whole-file round-trip coverage over realistic module shapes.

use shunt_cst::{parse, NodeKind};

const APP_MODULE: &str = r#"#!/usr/bin/env python
# -*- coding: utf-8 -*-
"""Order processing entry points."""

import json
import os.path
import collections.abc as abc_types
from dataclasses import dataclass, field
from app.billing import (
    invoice,
    ledger as gl,
)
from . import utils

DEFAULT_TIMEOUT = 30.5
PATTERNS = {
    'id': r'\d+',
    'name': "[a-z]+",  # lowercase only
}


@dataclass
class Order:
    items: list = field(default_factory=list)

    def total(self):
        # prices come from the ledger
        return gl.summarize(self.items,
                            timeout=DEFAULT_TIMEOUT)


def dump(order, stream=None):
    payload = json.dumps(order.items)
    target = stream or os.path.join('/tmp', 'orders.json')
    invoice.write(target, payload); utils.log(target)
    return payload
"#;

const GNARLY_WHITESPACE: &str =
    "import   a .  b\nx\t=\t{ 'k' : [1 ,2] }\nif x :\n\tpass\n\n\n# trailing commentary\n";

#[test]
fn realistic_module_round_trips() {
    let tree = parse(APP_MODULE).expect("parse failed");
    assert_eq!(tree.serialize(), APP_MODULE);
}

#[test]
fn gnarly_whitespace_round_trips() {
    let tree = parse(GNARLY_WHITESPACE).expect("parse failed");
    assert_eq!(tree.serialize(), GNARLY_WHITESPACE);
}

#[test]
fn crlf_module_round_trips() {
    let source = "import a\r\n\r\nclass B:\r\n    pass\r\n";
    let tree = parse(source).expect("parse failed");
    assert_eq!(tree.serialize(), source);
}

#[test]
fn import_statements_are_found_in_realistic_module() {
    let tree = parse(APP_MODULE).expect("parse failed");
    let imports: Vec<String> = tree
        .children(tree.root())
        .iter()
        .filter(|s| tree.kind(**s).is_import())
        .map(|s| tree.text_of(*s).trim_end().to_string())
        .collect();
    assert_eq!(
        imports,
        vec![
            "import json",
            "import os.path",
            "import collections.abc as abc_types",
            "from dataclasses import dataclass, field",
            "from app.billing import (\n    invoice,\n    ledger as gl,\n)",
            "from . import utils",
        ]
    );
}

#[test]
fn single_token_edit_leaves_other_bytes_alone() {
    let source = "import aaa  # keep me\nvalue = aaa.compute( 1 , 2 )\n";
    let mut tree = parse(source).expect("parse failed");

    // Rename both `aaa` name leaves.
    let names: Vec<_> = tree
        .walk(tree.root())
        .into_iter()
        .filter(|n| tree.kind(*n) == NodeKind::Name && tree.value(*n) == "aaa")
        .collect();
    assert_eq!(names.len(), 2);
    for name in names {
        tree.set_value(name, "bbb");
    }

    assert_eq!(
        tree.serialize(),
        "import bbb  # keep me\nvalue = bbb.compute( 1 , 2 )\n"
    );
}

#[test]
fn parse_failure_carries_location() {
    let err = parse("def broken(:\n    'unterminated\n").expect_err("should fail");
    assert_eq!(err.line, 2);
}
