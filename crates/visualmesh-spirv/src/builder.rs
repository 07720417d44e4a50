use std::mem::take;

use rspirv::{
    dr::{Instruction, Operand},
    spirv::{AddressingModel, Capability, Decoration, MemoryModel, Op, Word},
};

use crate::{
    error::{BuildError, BuildResult},
    function::FunctionState,
    item::{check_vector_width, Elem, Item},
    lookups::LookupTables,
    module::{version_word, Function, Header, Module},
    variable::Value,
};

/// Module wide settings, fixed when the builder is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    /// SPIR-V version as `(major, minor)`.
    pub version: (u8, u8),
    /// Generator magic stored in the header.
    pub generator: u32,
    /// Emit `OpSource`/`OpName` debug annotations.
    pub debug_symbols: bool,
    pub addressing_model: AddressingModel,
    pub memory_model: MemoryModel,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            version: (1, 0),
            generator: 0,
            debug_symbols: false,
            addressing_model: AddressingModel::Logical,
            memory_model: MemoryModel::GLSL450,
        }
    }
}

/// Append-only builder for a single SPIR-V module.
///
/// The builder owns every section of the module under construction. Types and constants are
/// interned on request, instructions are appended to the function that is currently open, and
/// [`ModuleBuilder::build`] consumes the builder to produce the binary.
#[derive(Debug)]
pub struct ModuleBuilder {
    pub config: ModuleConfig,
    pub(crate) state: LookupTables,
    next_id: Word,

    pub(crate) capabilities: Vec<Instruction>,
    pub(crate) extensions: Vec<Instruction>,
    pub(crate) ext_inst_imports: Vec<Instruction>,
    pub(crate) entry_points: Vec<Instruction>,
    pub(crate) execution_modes: Vec<Instruction>,
    pub(crate) debug_source: Vec<Instruction>,
    pub(crate) debug_names: Vec<Instruction>,
    pub(crate) annotations: Vec<Instruction>,
    pub(crate) types_global_values: Vec<Instruction>,
    pub(crate) functions: Vec<Function>,

    pub(crate) function: Option<FunctionState>,
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new(ModuleConfig::default())
    }
}

impl ModuleBuilder {
    pub fn new(config: ModuleConfig) -> Self {
        Self {
            config,
            state: LookupTables::default(),
            next_id: 1,
            capabilities: Vec::new(),
            extensions: Vec::new(),
            ext_inst_imports: Vec::new(),
            entry_points: Vec::new(),
            execution_modes: Vec::new(),
            debug_source: Vec::new(),
            debug_names: Vec::new(),
            annotations: Vec::new(),
            types_global_values: Vec::new(),
            functions: Vec::new(),
            function: None,
        }
    }

    /// Allocate a fresh id. Ids are never reused.
    pub fn id(&mut self) -> Word {
        let id = self.next_id;
        self.next_id += 1;
        log::trace!("allocated %{id}");
        id
    }

    /// One past the highest allocated id.
    pub fn bound(&self) -> Word {
        self.next_id
    }

    pub fn capability(&mut self, capability: Capability) {
        if self.state.capabilities.insert(capability) {
            self.capabilities.push(Instruction::new(
                Op::Capability,
                None,
                None,
                vec![Operand::Capability(capability)],
            ));
        }
    }

    pub fn extension(&mut self, name: &str) {
        if self.state.extensions.insert(name.to_string()) {
            self.extensions.push(Instruction::new(
                Op::Extension,
                None,
                None,
                vec![Operand::LiteralString(name.to_string())],
            ));
        }
    }

    /// Import an extended instruction set, returning the existing import if already present.
    pub fn ext_inst_import(&mut self, name: &str) -> Word {
        if let Some(existing) = self.state.ext_inst_imports.get(name) {
            return *existing;
        }
        let id = self.id();
        self.ext_inst_imports.push(Instruction::new(
            Op::ExtInstImport,
            None,
            Some(id),
            vec![Operand::LiteralString(name.to_string())],
        ));
        self.state.ext_inst_imports.insert(name.to_string(), id);
        id
    }

    /// Intern a type, emitting its definition the first time it is requested.
    pub fn type_id(&mut self, item: &Item) -> BuildResult<Word> {
        if let Some(existing) = self.state.types.get(item) {
            return Ok(*existing);
        }

        let (op, operands) = match item {
            Item::Scalar(Elem::Void) => (Op::TypeVoid, vec![]),
            Item::Scalar(Elem::Bool) => (Op::TypeBool, vec![]),
            Item::Scalar(Elem::Int(width, signed)) => (
                Op::TypeInt,
                vec![
                    Operand::LiteralBit32(*width),
                    Operand::LiteralBit32(*signed as u32),
                ],
            ),
            Item::Scalar(Elem::Float(width)) => {
                if *width == 64 {
                    self.capability(Capability::Float64);
                }
                (Op::TypeFloat, vec![Operand::LiteralBit32(*width)])
            }
            Item::Vector(elem, width) => {
                check_vector_width(*width)?;
                if *elem == Elem::Void {
                    return Err(BuildError::TypeMismatch {
                        op: Op::TypeVector,
                        expected: "scalar component".into(),
                        found: elem.to_string(),
                    });
                }
                let elem = self.type_id(&Item::Scalar(*elem))?;
                (
                    Op::TypeVector,
                    vec![Operand::IdRef(elem), Operand::LiteralBit32(*width)],
                )
            }
            Item::RuntimeArray(inner) => {
                let inner = self.type_id(inner)?;
                (Op::TypeRuntimeArray, vec![Operand::IdRef(inner)])
            }
            Item::Struct(members) => {
                let members = members
                    .iter()
                    .map(|member| self.type_id(member).map(Operand::IdRef))
                    .collect::<BuildResult<Vec<_>>>()?;
                (Op::TypeStruct, members)
            }
            Item::Pointer(storage_class, inner) => {
                let inner = self.type_id(inner)?;
                (
                    Op::TypePointer,
                    vec![Operand::StorageClass(*storage_class), Operand::IdRef(inner)],
                )
            }
            Item::Image(image) => {
                let sampled_type = self.type_id(&Item::Scalar(image.sampled_type))?;
                (
                    Op::TypeImage,
                    vec![
                        Operand::IdRef(sampled_type),
                        Operand::Dim(image.dim),
                        Operand::LiteralBit32(image.depth),
                        Operand::LiteralBit32(image.arrayed as u32),
                        Operand::LiteralBit32(image.multisampled as u32),
                        Operand::LiteralBit32(image.sampled),
                        Operand::ImageFormat(image.format),
                    ],
                )
            }
            Item::Sampler => (Op::TypeSampler, vec![]),
            Item::SampledImage(image) => {
                if !matches!(image.as_ref(), Item::Image(_)) {
                    return Err(BuildError::TypeMismatch {
                        op: Op::TypeSampledImage,
                        expected: "image".into(),
                        found: image.to_string(),
                    });
                }
                let image = self.type_id(image)?;
                (Op::TypeSampledImage, vec![Operand::IdRef(image)])
            }
            Item::Function(ret, params) => {
                let ret = self.type_id(ret)?;
                let mut operands = vec![Operand::IdRef(ret)];
                for param in params {
                    operands.push(Operand::IdRef(self.type_id(param)?));
                }
                (Op::TypeFunction, operands)
            }
        };

        let id = self.id();
        self.define_type(id, item.clone())?;
        self.types_global_values
            .push(Instruction::new(op, None, Some(id), operands));

        if let Item::RuntimeArray(inner) = item {
            self.decorate(
                id,
                Decoration::ArrayStride,
                vec![Operand::LiteralBit32(inner.size())],
            )?;
        }
        if self.config.debug_symbols {
            self.name(id, format!("{item}"))?;
        }
        Ok(id)
    }

    fn define_type(&mut self, id: Word, item: Item) -> BuildResult<()> {
        if self.state.items.contains_key(&id) {
            return Err(BuildError::Redefinition(id));
        }
        self.state.types.insert(item.clone(), id);
        self.state.items.insert(id, item);
        Ok(())
    }

    /// The structure behind an interned type id.
    pub fn item(&self, ty: Word) -> BuildResult<&Item> {
        self.state.items.get(&ty).ok_or(BuildError::UndefinedId(ty))
    }

    /// Type of any id visible from the current position: locals of the open function first, then
    /// module scope constants, variables and functions.
    pub fn type_of(&self, id: Word) -> Option<Word> {
        self.function
            .as_ref()
            .and_then(|function| function.locals.get(&id).copied())
            .or_else(|| self.state.global_type(id))
    }

    /// Make sure `value` is visible and typed as it claims to be, returning its structure.
    pub fn check(&self, op: Op, value: &Value) -> BuildResult<Item> {
        match self.type_of(value.id) {
            Some(ty) if ty == value.ty => Ok(self.item(ty)?.clone()),
            Some(ty) => Err(BuildError::TypeMismatch {
                op,
                expected: self.item(ty)?.to_string(),
                found: self.item(value.ty)?.to_string(),
            }),
            None => Err(BuildError::UndefinedId(value.id)),
        }
    }

    /// Append a constant or module scope variable to the global section.
    pub(crate) fn define_global(
        &mut self,
        op: Op,
        ty: Word,
        operands: Vec<Operand>,
    ) -> BuildResult<Value> {
        let id = self.id();
        if self.state.globals.insert(id, ty).is_some() {
            return Err(BuildError::Redefinition(id));
        }
        self.types_global_values
            .push(Instruction::new(op, Some(ty), Some(id), operands));
        Ok(Value::new(id, ty))
    }

    /// Close the module, returning its sections.
    pub fn finish(mut self) -> BuildResult<Module> {
        if let Some(function) = &self.function {
            return Err(BuildError::NestedFunction(function.id));
        }
        if let Some(id) = self.state.forward_calls.keys().next() {
            return Err(BuildError::UndefinedId(*id));
        }

        let (major, minor) = self.config.version;
        let memory_model = Instruction::new(
            Op::MemoryModel,
            None,
            None,
            vec![
                Operand::AddressingModel(self.config.addressing_model),
                Operand::MemoryModel(self.config.memory_model),
            ],
        );

        let module = Module {
            header: Header {
                version: version_word(major, minor),
                generator: self.config.generator,
                bound: self.bound(),
            },
            capabilities: take(&mut self.capabilities),
            extensions: take(&mut self.extensions),
            ext_inst_imports: take(&mut self.ext_inst_imports),
            memory_model,
            entry_points: take(&mut self.entry_points),
            execution_modes: take(&mut self.execution_modes),
            debug_source: take(&mut self.debug_source),
            debug_names: take(&mut self.debug_names),
            annotations: take(&mut self.annotations),
            types_global_values: take(&mut self.types_global_values),
            functions: take(&mut self.functions),
        };
        log::debug!(
            "Finished module with {} functions, bound {}",
            module.functions.len(),
            module.header.bound
        );
        Ok(module)
    }

    /// Close the module and serialize it.
    pub fn build(self) -> BuildResult<Vec<u32>> {
        Ok(self.finish()?.assemble())
    }
}
