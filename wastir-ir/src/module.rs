use crate::expr::ExprList;
use crate::location::Location;
use crate::types::{ExternalKind, FuncDeclaration, FuncSignature, Limits, LocalTypes, ValType};
use crate::var::{BindingTable, Index, Var};

// https://webassembly.github.io/spec/core/text/modules.html#text-typedef
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncType {
    pub name: Option<String>,
    pub sig: FuncSignature,
}

// https://webassembly.github.io/spec/core/text/modules.html#text-func
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Func {
    pub name: Option<String>,
    pub loc: Location,
    pub decl: FuncDeclaration,
    pub local_types: LocalTypes,
    // Params and locals share one index space, params first
    pub bindings: BindingTable,
    pub exprs: ExprList,
}

impl Func {
    pub fn num_params(&self) -> Index {
        self.decl.sig.params.len() as Index
    }

    pub fn num_locals(&self) -> Index {
        self.local_types.len()
    }

    pub fn num_params_and_locals(&self) -> Index {
        self.num_params() + self.num_locals()
    }

    pub fn local_type(&self, idx: Index) -> Option<ValType> {
        let params = self.num_params();
        if idx < params {
            self.decl.sig.params.get(idx as usize).copied()
        } else {
            self.local_types.get(idx - params)
        }
    }
}

// https://webassembly.github.io/spec/core/text/modules.html#tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: Option<String>,
    pub elem_limits: Limits,
    pub elem_type: ValType,
}

// https://webassembly.github.io/spec/core/text/modules.html#memories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    pub name: Option<String>,
    pub page_limits: Limits,
}

// https://webassembly.github.io/spec/core/text/modules.html#globals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name: Option<String>,
    pub ty: ValType,
    pub mutable: bool,
    pub init_expr: ExprList,
}

// https://webassembly.github.io/exception-handling/core/text/modules.html#tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub name: Option<String>,
    pub decl: FuncDeclaration,
}

// https://webassembly.github.io/spec/core/text/modules.html#text-importdesc
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDesc {
    Func(Func),
    Table(Table),
    Memory(Memory),
    Global(Global),
    Tag(Tag),
}

impl ImportDesc {
    pub fn kind(&self) -> ExternalKind {
        match self {
            ImportDesc::Func(_) => ExternalKind::Func,
            ImportDesc::Table(_) => ExternalKind::Table,
            ImportDesc::Memory(_) => ExternalKind::Memory,
            ImportDesc::Global(_) => ExternalKind::Global,
            ImportDesc::Tag(_) => ExternalKind::Tag,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ImportDesc::Func(f) => f.name.as_deref(),
            ImportDesc::Table(t) => t.name.as_deref(),
            ImportDesc::Memory(m) => m.name.as_deref(),
            ImportDesc::Global(g) => g.name.as_deref(),
            ImportDesc::Tag(t) => t.name.as_deref(),
        }
    }
}

// https://webassembly.github.io/spec/core/text/modules.html#text-import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module_name: String,
    pub field_name: String,
    pub desc: ImportDesc,
}

// https://webassembly.github.io/spec/core/text/modules.html#text-export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub kind: ExternalKind,
    pub var: Var,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Active,
    Passive,
    Declared,
}

// https://webassembly.github.io/spec/core/text/modules.html#element-segments
//
// Each element is a constant expression. The `func $f ...` short form is stored as one
// `ref.func $f` expression per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElemSegment {
    pub name: Option<String>,
    pub kind: SegmentKind,
    pub table_var: Var,
    pub offset: ExprList,
    pub elem_type: ValType,
    pub elem_exprs: Vec<ExprList>,
}

// https://webassembly.github.io/spec/core/text/modules.html#data-segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    pub name: Option<String>,
    pub kind: SegmentKind,
    pub memory_var: Var,
    pub offset: ExprList,
    pub data: Vec<u8>,
}

// Placement hint of `(@custom "name" (after func) ...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomPlace {
    pub before: bool,
    pub section: String,
}

// https://webassembly.github.io/annotations/core/custom/annotations.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Custom {
    pub name: String,
    pub place: Option<CustomPlace>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleFieldKind {
    Type(FuncType),
    Import(Import),
    Func(Func),
    Table(Table),
    Memory(Memory),
    Global(Global),
    Export(Export),
    Start(Var),
    ElemSegment(ElemSegment),
    DataSegment(DataSegment),
    Tag(Tag),
    Custom(Custom),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleField {
    pub loc: Location,
    pub kind: ModuleFieldKind,
}

impl ModuleField {
    pub fn new(kind: ModuleFieldKind, loc: Location) -> Self {
        ModuleField { loc, kind }
    }
}

// https://webassembly.github.io/spec/core/text/modules.html#text-module
//
// Fields are kept in source order. The vectors `funcs`, `globals`, ... hold positions in `fields`
// and the position of an entry in those vectors is the index of the entity in its index space.
// They are maintained by `append_field` so fields must never be pushed directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub name: Option<String>,
    pub loc: Location,
    pub fields: Vec<ModuleField>,

    pub types: Vec<usize>,
    pub funcs: Vec<usize>,
    pub tables: Vec<usize>,
    pub memories: Vec<usize>,
    pub globals: Vec<usize>,
    pub tags: Vec<usize>,
    pub elem_segments: Vec<usize>,
    pub data_segments: Vec<usize>,
    pub imports: Vec<usize>,
    pub exports: Vec<usize>,
    pub starts: Vec<usize>,
    pub customs: Vec<usize>,

    pub num_func_imports: Index,
    pub num_table_imports: Index,
    pub num_memory_imports: Index,
    pub num_global_imports: Index,
    pub num_tag_imports: Index,

    pub type_bindings: BindingTable,
    pub func_bindings: BindingTable,
    pub table_bindings: BindingTable,
    pub memory_bindings: BindingTable,
    pub global_bindings: BindingTable,
    pub tag_bindings: BindingTable,
    pub elem_segment_bindings: BindingTable,
    pub data_segment_bindings: BindingTable,
}

fn bind(table: &mut BindingTable, name: &Option<String>, index: usize, loc: &Location) {
    if let Some(name) = name {
        table.insert(name.clone(), index as Index, loc.clone());
    }
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_field(&mut self, field: ModuleField) {
        let pos = self.fields.len();
        let loc = &field.loc;
        match &field.kind {
            ModuleFieldKind::Type(t) => {
                bind(&mut self.type_bindings, &t.name, self.types.len(), loc);
                self.types.push(pos);
            }
            ModuleFieldKind::Import(import) => {
                match &import.desc {
                    ImportDesc::Func(f) => {
                        bind(&mut self.func_bindings, &f.name, self.funcs.len(), loc);
                        self.funcs.push(pos);
                        self.num_func_imports += 1;
                    }
                    ImportDesc::Table(t) => {
                        bind(&mut self.table_bindings, &t.name, self.tables.len(), loc);
                        self.tables.push(pos);
                        self.num_table_imports += 1;
                    }
                    ImportDesc::Memory(m) => {
                        bind(&mut self.memory_bindings, &m.name, self.memories.len(), loc);
                        self.memories.push(pos);
                        self.num_memory_imports += 1;
                    }
                    ImportDesc::Global(g) => {
                        bind(&mut self.global_bindings, &g.name, self.globals.len(), loc);
                        self.globals.push(pos);
                        self.num_global_imports += 1;
                    }
                    ImportDesc::Tag(t) => {
                        bind(&mut self.tag_bindings, &t.name, self.tags.len(), loc);
                        self.tags.push(pos);
                        self.num_tag_imports += 1;
                    }
                }
                self.imports.push(pos);
            }
            ModuleFieldKind::Func(f) => {
                bind(&mut self.func_bindings, &f.name, self.funcs.len(), loc);
                self.funcs.push(pos);
            }
            ModuleFieldKind::Table(t) => {
                bind(&mut self.table_bindings, &t.name, self.tables.len(), loc);
                self.tables.push(pos);
            }
            ModuleFieldKind::Memory(m) => {
                bind(&mut self.memory_bindings, &m.name, self.memories.len(), loc);
                self.memories.push(pos);
            }
            ModuleFieldKind::Global(g) => {
                bind(&mut self.global_bindings, &g.name, self.globals.len(), loc);
                self.globals.push(pos);
            }
            ModuleFieldKind::Export(_) => self.exports.push(pos),
            ModuleFieldKind::Start(_) => self.starts.push(pos),
            ModuleFieldKind::ElemSegment(e) => {
                bind(&mut self.elem_segment_bindings, &e.name, self.elem_segments.len(), loc);
                self.elem_segments.push(pos);
            }
            ModuleFieldKind::DataSegment(d) => {
                bind(&mut self.data_segment_bindings, &d.name, self.data_segments.len(), loc);
                self.data_segments.push(pos);
            }
            ModuleFieldKind::Tag(t) => {
                bind(&mut self.tag_bindings, &t.name, self.tags.len(), loc);
                self.tags.push(pos);
            }
            ModuleFieldKind::Custom(_) => self.customs.push(pos),
        }
        self.fields.push(field);
    }

    // True when an import of this kind would follow a definition of the same kind
    pub fn has_definition_of(&self, kind: ExternalKind) -> bool {
        match kind {
            ExternalKind::Func => self.funcs.len() as Index != self.num_func_imports,
            ExternalKind::Table => self.tables.len() as Index != self.num_table_imports,
            ExternalKind::Memory => self.memories.len() as Index != self.num_memory_imports,
            ExternalKind::Global => self.globals.len() as Index != self.num_global_imports,
            ExternalKind::Tag => self.tags.len() as Index != self.num_tag_imports,
        }
    }

    fn field_at(&self, positions: &[usize], idx: Index) -> Option<&ModuleFieldKind> {
        let pos = *positions.get(idx as usize)?;
        self.fields.get(pos).map(|f| &f.kind)
    }

    pub fn func(&self, idx: Index) -> Option<&Func> {
        match self.field_at(&self.funcs, idx)? {
            ModuleFieldKind::Func(f) => Some(f),
            ModuleFieldKind::Import(Import {
                desc: ImportDesc::Func(f),
                ..
            }) => Some(f),
            _ => None,
        }
    }

    pub fn table(&self, idx: Index) -> Option<&Table> {
        match self.field_at(&self.tables, idx)? {
            ModuleFieldKind::Table(t) => Some(t),
            ModuleFieldKind::Import(Import {
                desc: ImportDesc::Table(t),
                ..
            }) => Some(t),
            _ => None,
        }
    }

    pub fn memory(&self, idx: Index) -> Option<&Memory> {
        match self.field_at(&self.memories, idx)? {
            ModuleFieldKind::Memory(m) => Some(m),
            ModuleFieldKind::Import(Import {
                desc: ImportDesc::Memory(m),
                ..
            }) => Some(m),
            _ => None,
        }
    }

    pub fn global(&self, idx: Index) -> Option<&Global> {
        match self.field_at(&self.globals, idx)? {
            ModuleFieldKind::Global(g) => Some(g),
            ModuleFieldKind::Import(Import {
                desc: ImportDesc::Global(g),
                ..
            }) => Some(g),
            _ => None,
        }
    }

    pub fn tag(&self, idx: Index) -> Option<&Tag> {
        match self.field_at(&self.tags, idx)? {
            ModuleFieldKind::Tag(t) => Some(t),
            ModuleFieldKind::Import(Import {
                desc: ImportDesc::Tag(t),
                ..
            }) => Some(t),
            _ => None,
        }
    }

    pub fn func_type(&self, idx: Index) -> Option<&FuncType> {
        match self.field_at(&self.types, idx)? {
            ModuleFieldKind::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn elem_segment(&self, idx: Index) -> Option<&ElemSegment> {
        match self.field_at(&self.elem_segments, idx)? {
            ModuleFieldKind::ElemSegment(e) => Some(e),
            _ => None,
        }
    }

    pub fn data_segment(&self, idx: Index) -> Option<&DataSegment> {
        match self.field_at(&self.data_segments, idx)? {
            ModuleFieldKind::DataSegment(d) => Some(d),
            _ => None,
        }
    }

    pub fn exports(&self) -> impl Iterator<Item = &Export> {
        self.exports.iter().filter_map(move |&pos| match &self.fields[pos].kind {
            ModuleFieldKind::Export(e) => Some(e),
            _ => None,
        })
    }
}
