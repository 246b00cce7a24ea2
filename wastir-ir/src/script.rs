use crate::expr::Const;
use crate::location::Location;
use crate::module::Module;
use crate::var::{BindingTable, Var};

// Module written inside a script command. Binary and quoted modules are kept undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptModule {
    Text(Module),
    Binary {
        name: Option<String>,
        loc: Location,
        data: Vec<u8>,
    },
    Quoted {
        name: Option<String>,
        loc: Location,
        data: Vec<u8>,
    },
}

impl ScriptModule {
    pub fn loc(&self) -> &Location {
        match self {
            ScriptModule::Text(m) => &m.loc,
            ScriptModule::Binary { loc, .. } | ScriptModule::Quoted { loc, .. } => loc,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ScriptModule::Text(m) => m.name.as_deref(),
            ScriptModule::Binary { name, .. } | ScriptModule::Quoted { name, .. } => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    // (invoke $mod? "name" const*)
    Invoke { name: String, args: Vec<Const> },
    // (get $mod? "name")
    Get { name: String },
}

// `module_var` refers to a module command of the script. It defaults to the latest module and is
// never rewritten by name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub loc: Location,
    pub module_var: Var,
    pub kind: ActionKind,
}

// https://github.com/WebAssembly/spec/tree/main/interpreter#scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Module(Module),
    ScriptModule(ScriptModule),
    Action(Action),
    Register {
        loc: Location,
        name: String,
        module_var: Var,
    },
    AssertMalformed {
        module: ScriptModule,
        text: String,
    },
    AssertInvalid {
        module: ScriptModule,
        text: String,
    },
    // assert_invalid whose module could not even be resolved. Such a module has no binary form.
    AssertInvalidNonBinary {
        module: ScriptModule,
        text: String,
    },
    AssertUnlinkable {
        module: ScriptModule,
        text: String,
    },
    AssertUninstantiable {
        module: ScriptModule,
        text: String,
    },
    AssertReturn {
        action: Action,
        expected: Vec<Const>,
    },
    AssertTrap {
        action: Action,
        text: String,
    },
    AssertExhaustion {
        action: Action,
        text: String,
    },
    AssertException {
        action: Action,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Module(_) | Command::ScriptModule(_) => "module",
            Command::Action(a) => match a.kind {
                ActionKind::Invoke { .. } => "invoke",
                ActionKind::Get { .. } => "get",
            },
            Command::Register { .. } => "register",
            Command::AssertMalformed { .. } => "assert_malformed",
            Command::AssertInvalid { .. } | Command::AssertInvalidNonBinary { .. } => "assert_invalid",
            Command::AssertUnlinkable { .. } => "assert_unlinkable",
            Command::AssertUninstantiable { .. } => "assert_uninstantiable",
            Command::AssertReturn { .. } => "assert_return",
            Command::AssertTrap { .. } => "assert_trap",
            Command::AssertExhaustion { .. } => "assert_exhaustion",
            Command::AssertException { .. } => "assert_exception",
        }
    }
}

// Root of a .wast file. `module_bindings` maps `$name` of module commands to command indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub commands: Vec<Command>,
    pub module_bindings: BindingTable,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.commands.iter().filter_map(|c| match c {
            Command::Module(m) => Some(m),
            _ => None,
        })
    }
}
