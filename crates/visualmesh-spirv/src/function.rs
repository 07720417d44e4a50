use hashbrown::HashMap;
use rspirv::{
    dr::{Instruction, Operand},
    spirv::{ExecutionMode, ExecutionModel, FunctionControl, Op, StorageClass, Word},
};

use crate::{
    builder::ModuleBuilder,
    error::{BuildError, BuildResult},
    item::Item,
    lookups::Signature,
    module::{Block, Function},
    variable::Value,
};

/// The function currently being written. Bodies are a single, branch free block.
#[derive(Debug)]
pub(crate) struct FunctionState {
    pub id: Word,
    pub ret: Word,
    pub def: Instruction,
    pub parameters: Vec<Instruction>,
    pub label: Instruction,
    pub instructions: Vec<Instruction>,
    /// Parameters and instruction results, only visible while the function is open.
    pub locals: HashMap<Word, Word>,
    pub terminated: bool,
}

/// Handle to a function opened with [`ModuleBuilder::begin_function`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub id: Word,
    pub ty: Word,
    pub ret: Word,
    pub parameters: Vec<Value>,
}

impl ModuleBuilder {
    /// Open a new function and return its parameters.
    pub fn begin_function(
        &mut self,
        name: &str,
        ret: &Item,
        params: &[Item],
        control: FunctionControl,
    ) -> BuildResult<FunctionDef> {
        if let Some(open) = &self.function {
            return Err(BuildError::NestedFunction(open.id));
        }
        let id = self.id();
        self.open_function(id, name, ret, params, control)
    }

    /// Reserve the id of a function that is called before it is defined.
    pub fn declare_function(&mut self, ret: &Item, params: &[Item]) -> BuildResult<Word> {
        let signature = self.signature(ret, params)?;
        let id = self.id();
        self.state.forward_calls.insert(id, signature);
        Ok(id)
    }

    /// Define a function previously reserved with [`ModuleBuilder::declare_function`].
    pub fn define_function(
        &mut self,
        id: Word,
        name: &str,
        ret: &Item,
        params: &[Item],
        control: FunctionControl,
    ) -> BuildResult<FunctionDef> {
        if let Some(open) = &self.function {
            return Err(BuildError::NestedFunction(open.id));
        }
        let declared = self
            .state
            .forward_calls
            .get(&id)
            .cloned()
            .ok_or(BuildError::UndefinedId(id))?;
        let signature = self.signature(ret, params)?;
        if declared != signature {
            return Err(BuildError::TypeMismatch {
                op: Op::Function,
                expected: self.item(declared.ty)?.to_string(),
                found: self.item(signature.ty)?.to_string(),
            });
        }
        self.state.forward_calls.remove(&id);
        self.open_function(id, name, ret, params, control)
    }

    fn signature(&mut self, ret: &Item, params: &[Item]) -> BuildResult<Signature> {
        let ty = self.type_id(&Item::function(ret.clone(), params.to_vec()))?;
        let ret = self.type_id(ret)?;
        let params = params
            .iter()
            .map(|param| self.type_id(param))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(Signature { ty, ret, params })
    }

    fn open_function(
        &mut self,
        id: Word,
        name: &str,
        ret: &Item,
        params: &[Item],
        control: FunctionControl,
    ) -> BuildResult<FunctionDef> {
        let signature = self.signature(ret, params)?;
        let def = Instruction::new(
            Op::Function,
            Some(signature.ret),
            Some(id),
            vec![
                Operand::FunctionControl(control),
                Operand::IdRef(signature.ty),
            ],
        );

        let mut locals = HashMap::new();
        let mut parameters = Vec::with_capacity(params.len());
        let mut values = Vec::with_capacity(params.len());
        for ty in signature.params.iter().copied() {
            let param = self.id();
            parameters.push(Instruction::new(
                Op::FunctionParameter,
                Some(ty),
                Some(param),
                vec![],
            ));
            locals.insert(param, ty);
            values.push(Value::new(param, ty));
        }

        let label = self.id();
        self.function = Some(FunctionState {
            id,
            ret: signature.ret,
            def,
            parameters,
            label: Instruction::new(Op::Label, None, Some(label), vec![]),
            instructions: Vec::new(),
            locals,
            terminated: false,
        });

        let def = FunctionDef {
            id,
            ty: signature.ty,
            ret: signature.ret,
            parameters: values,
        };
        self.state.functions.insert(id, signature);
        self.name(id, name)?;
        log::trace!("begin function {name} (%{id})");
        Ok(def)
    }

    /// Open a compute entry point. Interface variables must be `Input` or `Output` globals.
    pub fn begin_entry_point(&mut self, name: &str, interface: &[Value]) -> BuildResult<FunctionDef> {
        if self.state.entry_points.contains_key(name) {
            return Err(BuildError::DuplicateEntryPoint(name.to_string()));
        }
        for variable in interface {
            let item = self.check(Op::EntryPoint, variable)?;
            if !matches!(
                item,
                Item::Pointer(StorageClass::Input | StorageClass::Output, _)
            ) {
                return Err(BuildError::TypeMismatch {
                    op: Op::EntryPoint,
                    expected: "Input or Output variable".into(),
                    found: item.to_string(),
                });
            }
        }

        let def = self.begin_function(name, &Item::void(), &[], FunctionControl::NONE)?;

        let mut operands = vec![
            Operand::ExecutionModel(ExecutionModel::GLCompute),
            Operand::IdRef(def.id),
            Operand::LiteralString(name.to_string()),
        ];
        operands.extend(interface.iter().map(|it| Operand::IdRef(it.id)));
        self.entry_points
            .push(Instruction::new(Op::EntryPoint, None, None, operands));
        self.state.entry_points.insert(name.to_string(), def.id);
        Ok(def)
    }

    pub fn execution_mode(
        &mut self,
        entry_point: Word,
        mode: ExecutionMode,
        literals: &[u32],
    ) -> BuildResult<()> {
        if !self.state.entry_points.values().any(|id| *id == entry_point) {
            return Err(BuildError::MissingTarget(entry_point));
        }
        let mut operands = vec![Operand::IdRef(entry_point), Operand::ExecutionMode(mode)];
        operands.extend(literals.iter().map(|it| Operand::LiteralBit32(*it)));
        self.execution_modes
            .push(Instruction::new(Op::ExecutionMode, None, None, operands));
        Ok(())
    }

    /// Fixed workgroup size of a compute entry point.
    pub fn local_size(&mut self, entry_point: Word, size: [u32; 3]) -> BuildResult<()> {
        self.execution_mode(entry_point, ExecutionMode::LocalSize, &size)
    }

    /// Terminate the body of the open function.
    pub fn return_function(&mut self, value: Option<Value>) -> BuildResult<()> {
        let op = match value {
            Some(_) => Op::ReturnValue,
            None => Op::Return,
        };
        let ret = self.current_function(op)?.ret;
        let void = self.type_id(&Item::void())?;

        let operands = match value {
            Some(value) => {
                self.check(op, &value)?;
                if value.ty != ret || ret == void {
                    return Err(BuildError::TypeMismatch {
                        op,
                        expected: self.item(ret)?.to_string(),
                        found: self.item(value.ty)?.to_string(),
                    });
                }
                vec![Operand::IdRef(value.id)]
            }
            None if ret != void => {
                return Err(BuildError::TypeMismatch {
                    op,
                    expected: self.item(ret)?.to_string(),
                    found: Item::void().to_string(),
                });
            }
            None => vec![],
        };

        let function = self.current_function(op)?;
        function
            .instructions
            .push(Instruction::new(op, None, None, operands));
        function.terminated = true;
        Ok(())
    }

    /// Close the open function. Its values are no longer visible afterwards.
    pub fn end_function(&mut self) -> BuildResult<()> {
        let function = self
            .function
            .take()
            .ok_or(BuildError::NoOpenFunction(Op::FunctionEnd))?;
        if !function.terminated {
            let id = function.id;
            self.function = Some(function);
            return Err(BuildError::MissingReturn(id));
        }
        log::trace!("end function %{}", function.id);
        self.functions.push(Function {
            def: function.def,
            parameters: function.parameters,
            blocks: vec![Block {
                label: function.label,
                instructions: function.instructions,
            }],
            end: Instruction::new(Op::FunctionEnd, None, None, vec![]),
        });
        Ok(())
    }

    /// Call a defined or declared function.
    pub fn call_function(&mut self, function: Word, args: &[Value]) -> BuildResult<Value> {
        if self.state.entry_points.values().any(|id| *id == function) {
            return Err(BuildError::EntryPointCall(function));
        }
        let signature = self
            .state
            .functions
            .get(&function)
            .or_else(|| self.state.forward_calls.get(&function))
            .cloned()
            .ok_or(BuildError::UndefinedId(function))?;

        if args.len() != signature.params.len() {
            return Err(BuildError::TypeMismatch {
                op: Op::FunctionCall,
                expected: format!("{} arguments", signature.params.len()),
                found: args.len().to_string(),
            });
        }
        for (arg, param) in args.iter().zip(signature.params.iter()) {
            let found = self.check(Op::FunctionCall, arg)?;
            if arg.ty != *param {
                return Err(BuildError::TypeMismatch {
                    op: Op::FunctionCall,
                    expected: self.item(*param)?.to_string(),
                    found: found.to_string(),
                });
            }
        }

        let mut operands = vec![Operand::IdRef(function)];
        operands.extend(args.iter().map(|arg| Operand::IdRef(arg.id)));
        self.emit_value(Op::FunctionCall, signature.ret, operands)
    }

    fn current_function(&mut self, op: Op) -> BuildResult<&mut FunctionState> {
        match self.function.as_mut() {
            None => Err(BuildError::NoOpenFunction(op)),
            Some(function) if function.terminated => Err(BuildError::BlockTerminated(op)),
            Some(function) => Ok(function),
        }
    }

    /// Append an instruction producing a value to the open block.
    pub(crate) fn emit_value(
        &mut self,
        op: Op,
        ty: Word,
        operands: Vec<Operand>,
    ) -> BuildResult<Value> {
        self.current_function(op)?;
        let id = self.id();
        let function = self.current_function(op)?;
        function
            .instructions
            .push(Instruction::new(op, Some(ty), Some(id), operands));
        function.locals.insert(id, ty);
        Ok(Value::new(id, ty))
    }

    /// Append an instruction without a result to the open block.
    pub(crate) fn emit_void(&mut self, op: Op, operands: Vec<Operand>) -> BuildResult<()> {
        self.current_function(op)?
            .instructions
            .push(Instruction::new(op, None, None, operands));
        Ok(())
    }
}
