use crate::protocol::Type;

use super::{BasicType, SignatureError, SignatureNode, MAX_DEPTH, MAX_SIGNATURE};

/// Recursive descent parser over signature bytes.
pub(super) struct Parser<'a> {
    bytes: &'a [u8],
    at: usize,
    arrays: usize,
    structs: usize,
    dicts: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(bytes: &'a [u8]) -> Result<Self, SignatureError> {
        if bytes.len() > MAX_SIGNATURE {
            return Err(SignatureError::SignatureTooLong);
        }

        Ok(Self {
            bytes,
            at: 0,
            arrays: 0,
            structs: 0,
            dicts: 0,
        })
    }

    /// Parse every complete type until the end of input.
    pub(super) fn parse_all(mut self) -> Result<Vec<SignatureNode>, SignatureError> {
        let mut nodes = Vec::new();

        while let Some(ty) = self.peek() {
            let node = match ty {
                Type::CLOSE_PAREN => return Err(SignatureError::StructEndedButNotStarted),
                Type::CLOSE_BRACE => return Err(SignatureError::DictEndedButNotStarted),
                _ => self.complete()?,
            };

            nodes.push(node);
        }

        Ok(nodes)
    }

    fn peek(&self) -> Option<Type> {
        self.bytes.get(self.at).map(|&b| Type(b))
    }

    fn next(&mut self) -> Option<Type> {
        let ty = self.peek()?;
        self.at += 1;
        Some(ty)
    }

    fn complete(&mut self) -> Result<SignatureNode, SignatureError> {
        let Some(ty) = self.next() else {
            return Err(SignatureError::MissingArrayElementType);
        };

        match ty {
            Type::ARRAY => self.array(),
            Type::OPEN_PAREN => self.structure(),
            Type::OPEN_BRACE => Err(SignatureError::DictEntryNotInsideArray),
            Type::CLOSE_PAREN => Err(SignatureError::StructEndedButNotStarted),
            Type::CLOSE_BRACE => Err(SignatureError::DictEndedButNotStarted),
            Type::VARIANT => Ok(SignatureNode::Variant),
            ty => match BasicType::from_type(ty) {
                Some(basic) => Ok(SignatureNode::Basic(basic)),
                None => Err(SignatureError::UnknownTypeCode(ty)),
            },
        }
    }

    fn array(&mut self) -> Result<SignatureNode, SignatureError> {
        if self.arrays == MAX_DEPTH {
            return Err(SignatureError::ExceededMaximumArrayRecursion);
        }

        self.arrays += 1;

        let element = match self.peek() {
            None | Some(Type::CLOSE_PAREN | Type::CLOSE_BRACE) => {
                return Err(SignatureError::MissingArrayElementType);
            }
            Some(Type::OPEN_BRACE) => {
                self.at += 1;
                self.dict_entry()?
            }
            Some(..) => self.complete()?,
        };

        self.arrays -= 1;
        Ok(SignatureNode::Array(Box::new(element)))
    }

    fn structure(&mut self) -> Result<SignatureNode, SignatureError> {
        if self.structs == MAX_DEPTH {
            return Err(SignatureError::ExceededMaximumStructRecursion);
        }

        self.structs += 1;
        let mut fields = Vec::new();

        loop {
            match self.peek() {
                None => return Err(SignatureError::StructStartedButNotEnded),
                Some(Type::CLOSE_PAREN) => {
                    self.at += 1;
                    break;
                }
                Some(Type::CLOSE_BRACE) => return Err(SignatureError::DictEndedButNotStarted),
                Some(..) => fields.push(self.complete()?),
            }
        }

        if fields.is_empty() {
            return Err(SignatureError::StructHasNoFields);
        }

        self.structs -= 1;
        Ok(SignatureNode::Struct(fields))
    }

    fn dict_entry(&mut self) -> Result<SignatureNode, SignatureError> {
        if self.dicts == MAX_DEPTH {
            return Err(SignatureError::ExceededMaximumDictRecursion);
        }

        self.dicts += 1;

        let key = match self.peek() {
            None => return Err(SignatureError::DictStartedButNotEnded),
            Some(Type::CLOSE_BRACE) => return Err(SignatureError::DictEntryHasNoFields),
            Some(..) => match self.complete()? {
                SignatureNode::Basic(basic) => basic,
                _ => return Err(SignatureError::DictKeyMustBeBasicType),
            },
        };

        let value = match self.peek() {
            None => return Err(SignatureError::DictStartedButNotEnded),
            Some(Type::CLOSE_BRACE) => return Err(SignatureError::DictEntryHasOnlyOneField),
            Some(..) => self.complete()?,
        };

        match self.next() {
            None => return Err(SignatureError::DictStartedButNotEnded),
            Some(Type::CLOSE_BRACE) => {}
            Some(..) => return Err(SignatureError::DictEntryHasTooManyFields),
        }

        self.dicts -= 1;
        Ok(SignatureNode::DictEntry(key, Box::new(value)))
    }
}
