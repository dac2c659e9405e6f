//! Declaration parsing implementation
//!
//! This module handles parsing of declarations, both at file scope and inside
//! function bodies:
//!
//! - Type specifiers: `unsigned long`, `const char`, `struct S`, `enum E`
//! - Struct definitions: `struct Name { ... };`
//! - Enum definitions: `enum [Name] { A, B = 4, C };`
//! - Function prototypes and definitions, including `...`
//! - Variable declarations with several declarators and initializers
//!
//! # Grammar
//!
//! ```text
//! declaration  ::= specifiers (";" | declarator_list ";" | function)
//! specifiers   ::= ("extern" | "const" | type_keyword | struct_spec | enum_spec)+
//! struct_spec  ::= "struct" identifier ["{" field_decl* "}"]
//! enum_spec    ::= "enum" [identifier] ["{" enumerator ("," enumerator)* [","] "}"]
//! declarator   ::= "*"* identifier ("[" [int_literal] "]")*
//! function     ::= declarator "(" params ")" (";" | "{" statements "}")
//! params       ::= "void" | param ("," param)* ["," "..."]
//! initializer  ::= assignment | "{" initializer ("," initializer)* [","] "}"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

/// Result of parsing a declaration's specifier list.
pub(crate) struct Specifiers {
    pub base: BaseType,
    pub is_extern: bool,
    /// Struct or enum defined inline by the specifiers.
    pub definition: Option<Declaration>,
    pub location: SourceLocation,
}

impl Parser {
    /// Parse a file-scope declaration. One source declaration can yield
    /// several entries (`struct S {..} ;` plus variables, `int a, b;`).
    pub(crate) fn parse_top_level_declaration(&mut self) -> Result<Vec<Declaration>, ParseError> {
        let specs = self.parse_specifiers()?;
        let mut decls = Vec::new();
        if let Some(definition) = specs.definition {
            decls.push(definition);
        }

        if self.match_token(&TokenKind::Semicolon) {
            return Ok(decls);
        }

        loop {
            let (name, var_type, location) = self.parse_declarator(&specs.base)?;

            if self.check(&TokenKind::LParen) && var_type.array_dims.is_empty() {
                let function = self.parse_function_rest(name, var_type, location)?;
                let has_body = function.body.is_some();
                decls.push(Declaration::Function(function));
                if has_body {
                    return Ok(decls);
                }
            } else {
                let init = self.parse_optional_initializer()?;
                decls.push(Declaration::Variable(VarDecl {
                    name,
                    var_type,
                    init,
                    is_extern: specs.is_extern,
                    location,
                    slot: None,
                }));
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_semicolon("after declaration")?;
        Ok(decls)
    }

    /// Parse a declaration statement inside a function body, including its `;`.
    pub(crate) fn parse_local_declaration(&mut self) -> Result<Stmt, ParseError> {
        let specs = self.parse_specifiers()?;
        if specs.definition.is_some() {
            return Err(ParseError {
                message: "Struct and enum definitions are only supported at file scope"
                    .to_string(),
                location: specs.location,
            });
        }

        let mut decls = Vec::new();
        loop {
            let (name, var_type, location) = self.parse_declarator(&specs.base)?;
            if self.check(&TokenKind::LParen) {
                return Err(ParseError {
                    message: "Function declarations are only supported at file scope".to_string(),
                    location,
                });
            }

            let init = self.parse_optional_initializer()?;
            decls.push(VarDecl {
                name,
                var_type,
                init,
                is_extern: specs.is_extern,
                location,
                slot: None,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_semicolon("after variable declaration")?;
        Ok(Stmt::Declaration(decls))
    }

    /// Parse a specifier list: storage class, qualifiers, and the base type.
    pub(crate) fn parse_specifiers(&mut self) -> Result<Specifiers, ParseError> {
        let location = self.current_location();
        let mut is_extern = false;
        let mut signedness: Option<bool> = None;
        let mut short = false;
        let mut long_count = 0;
        let mut int_keyword = false;
        let mut base: Option<BaseType> = None;
        let mut definition = None;

        loop {
            let spec_loc = self.current_location();
            match &self.peek().kind {
                TokenKind::Const => {
                    self.advance();
                }
                TokenKind::Extern => {
                    self.advance();
                    is_extern = true;
                }
                TokenKind::Signed | TokenKind::Unsigned => {
                    let signed = self.check(&TokenKind::Signed);
                    if signedness.is_some() {
                        return Err(Self::invalid_specifiers(spec_loc));
                    }
                    self.advance();
                    signedness = Some(signed);
                }
                TokenKind::Short => {
                    self.advance();
                    short = true;
                }
                TokenKind::Long => {
                    self.advance();
                    long_count += 1;
                    if long_count > 2 {
                        return Err(Self::invalid_specifiers(spec_loc));
                    }
                }
                TokenKind::Int => {
                    if int_keyword {
                        return Err(Self::invalid_specifiers(spec_loc));
                    }
                    self.advance();
                    int_keyword = true;
                }
                TokenKind::Char | TokenKind::Void | TokenKind::Struct | TokenKind::Enum => {
                    if base.is_some() {
                        return Err(Self::invalid_specifiers(spec_loc));
                    }
                    let keyword = self.advance().kind.clone();
                    let (parsed, def) = match keyword {
                        TokenKind::Char => (BaseType::Char, None),
                        TokenKind::Void => (BaseType::Void, None),
                        TokenKind::Struct => self.parse_struct_specifier()?,
                        _ => self.parse_enum_specifier()?,
                    };
                    base = Some(parsed);
                    definition = def;
                }
                _ => break,
            }
        }

        let plain = !short && long_count == 0 && !int_keyword;
        let base = match base {
            Some(BaseType::Char) if plain => match signedness {
                None => BaseType::Char,
                Some(signed) => BaseType::Integer { bits: 8, signed },
            },
            Some(other) if plain && signedness.is_none() => other,
            Some(_) => return Err(Self::invalid_specifiers(location)),
            None => {
                if plain && signedness.is_none() {
                    return Err(self.error_expected("type"));
                }
                if short && long_count > 0 {
                    return Err(Self::invalid_specifiers(location));
                }
                let bits = if short {
                    16
                } else if long_count > 0 {
                    64
                } else {
                    32
                };
                BaseType::Integer {
                    bits,
                    signed: signedness.unwrap_or(true),
                }
            }
        };

        Ok(Specifiers {
            base,
            is_extern,
            definition,
            location,
        })
    }

    fn invalid_specifiers(location: SourceLocation) -> ParseError {
        ParseError {
            message: "Invalid combination of type specifiers".to_string(),
            location,
        }
    }

    /// Parse after `struct`: a tag, optionally followed by a field list.
    fn parse_struct_specifier(&mut self) -> Result<(BaseType, Option<Declaration>), ParseError> {
        let location = self.previous_location();
        let name = self.expect_identifier()?;

        if !self.match_token(&TokenKind::LBrace) {
            return Ok((BaseType::Struct(name), None));
        }

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let specs = self.parse_specifiers()?;
            if specs.definition.is_some() {
                return Err(ParseError {
                    message: "Nested struct and enum definitions are not supported".to_string(),
                    location: specs.location,
                });
            }
            loop {
                let (field_name, field_type, field_loc) = self.parse_declarator(&specs.base)?;
                fields.push(Field {
                    name: field_name,
                    field_type,
                    location: field_loc,
                });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect_semicolon("after struct field")?;
        }
        self.expect_rbrace("after struct fields")?;

        let def = Declaration::Struct(StructDef {
            name: name.clone(),
            fields,
            location,
        });
        Ok((BaseType::Struct(name), Some(def)))
    }

    /// Parse after `enum`: an optional tag and an optional enumerator list.
    fn parse_enum_specifier(&mut self) -> Result<(BaseType, Option<Declaration>), ParseError> {
        let location = self.previous_location();
        let name = match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };

        if !self.match_token(&TokenKind::LBrace) {
            return match name {
                Some(name) => Ok((BaseType::Enum(name), None)),
                None => Err(self.error_expected("enum name or '{'")),
            };
        }

        let mut enumerators = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let enumerator_loc = self.current_location();
            let enumerator = self.expect_identifier()?;
            let value = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_ternary()?)
            } else {
                None
            };
            enumerators.push(Enumerator {
                name: enumerator,
                value,
                location: enumerator_loc,
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_rbrace("after enumerators")?;

        // Anonymous enums only introduce constants; their objects are plain ints.
        let base = match &name {
            Some(name) => BaseType::Enum(name.clone()),
            None => BaseType::Integer {
                bits: 32,
                signed: true,
            },
        };
        let def = Declaration::Enum(EnumDef {
            name,
            enumerators,
            location,
        });
        Ok((base, Some(def)))
    }

    /// Parse `*`* identifier `[N]`*, returning the name, full type, and the
    /// identifier's location.
    pub(crate) fn parse_declarator(
        &mut self,
        base: &BaseType,
    ) -> Result<(String, TypeName, SourceLocation), ParseError> {
        let mut var_type = TypeName::new(base.clone());
        while self.match_token(&TokenKind::Star) {
            var_type = var_type.with_pointer();
        }

        let location = self.current_location();
        let name = self.expect_identifier()?;
        self.parse_array_dims(&mut var_type)?;

        Ok((name, var_type, location))
    }

    /// Parse trailing `[N]` / `[]` dimensions onto `var_type`.
    pub(crate) fn parse_array_dims(&mut self, var_type: &mut TypeName) -> Result<(), ParseError> {
        while self.match_token(&TokenKind::LBracket) {
            if self.match_token(&TokenKind::RBracket) {
                var_type.array_dims.push(None);
                continue;
            }

            let size_loc = self.current_location();
            let size_expr = self.parse_ternary()?;
            match size_expr.kind {
                ExprKind::IntLiteral(n) if n > 0 => var_type.array_dims.push(Some(n as usize)),
                _ => {
                    return Err(ParseError {
                        message: "Array size must be a positive integer constant".to_string(),
                        location: size_loc,
                    })
                }
            }
            self.expect_token(&TokenKind::RBracket, "after array size")?;
        }
        Ok(())
    }

    /// Parse `(params)` and an optional body after a function's declarator.
    fn parse_function_rest(
        &mut self,
        name: String,
        return_type: TypeName,
        location: SourceLocation,
    ) -> Result<FunctionDef, ParseError> {
        self.expect_lparen("after function name")?;
        let (params, variadic) = self.parse_parameter_list()?;
        self.expect_rparen("after parameters")?;

        let body = if self.match_token(&TokenKind::LBrace) {
            if let Some(unnamed) = params.iter().find(|p| p.name.is_none()) {
                return Err(ParseError {
                    message: "Expected parameter name in function definition".to_string(),
                    location: unnamed.location,
                });
            }
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after function body")?;
            Some(statements)
        } else {
            None
        };

        Ok(FunctionDef {
            name,
            params,
            variadic,
            return_type,
            body,
            location,
        })
    }

    /// Parse parameter list: (type [name], type [name], ...)
    pub(crate) fn parse_parameter_list(&mut self) -> Result<(Vec<Param>, bool), ParseError> {
        let mut params = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok((params, false));
        }

        // Special case: (void) means no parameters in C
        if self.check(&TokenKind::Void)
            && matches!(self.peek_ahead(1).map(|t| &t.kind), Some(TokenKind::RParen))
        {
            self.advance();
            return Ok((params, false));
        }

        let mut variadic = false;
        loop {
            if self.match_token(&TokenKind::Ellipsis) {
                if params.is_empty() {
                    return Err(ParseError {
                        message: "Expected a named parameter before '...'".to_string(),
                        location: self.previous_location(),
                    });
                }
                variadic = true;
                break;
            }

            let specs = self.parse_specifiers()?;
            let mut param_type = TypeName::new(specs.base);
            while self.match_token(&TokenKind::Star) {
                param_type = param_type.with_pointer();
            }

            let mut location = self.current_location();
            let name = match &self.peek().kind {
                TokenKind::Ident(name) => {
                    let name = name.clone();
                    self.advance();
                    Some(name)
                }
                _ => {
                    location = specs.location;
                    None
                }
            };
            self.parse_array_dims(&mut param_type)?;

            params.push(Param {
                name,
                param_type,
                location,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok((params, variadic))
    }

    fn parse_optional_initializer(&mut self) -> Result<Option<Initializer>, ParseError> {
        if self.match_token(&TokenKind::Eq) {
            Ok(Some(self.parse_initializer()?))
        } else {
            Ok(None)
        }
    }

    /// Parse a scalar initializer or a brace-enclosed list.
    pub(crate) fn parse_initializer(&mut self) -> Result<Initializer, ParseError> {
        if !self.match_token(&TokenKind::LBrace) {
            return Ok(Initializer::Expr(self.parse_assignment()?));
        }

        let location = self.previous_location();
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            items.push(self.parse_initializer()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_rbrace("after initializer list")?;

        Ok(Initializer::List(items, location))
    }
}
