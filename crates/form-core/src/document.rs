//! PDF Document wrapper

use crate::{FormError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;

/// Location of an array node inside the object arena
///
/// An array either is an indirect object itself (`path` empty) or is stored
/// directly inside the dictionary of `owner`, reached by following `path`.
/// Mutating through a slot changes the array in place, so every structure
/// that points at the array (or at its owner) observes the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArraySlot {
    owner: ObjectId,
    path: Vec<Vec<u8>>,
}

impl ArraySlot {
    /// Object that physically holds the array
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    /// True when the array is an indirect object of its own
    pub fn is_indirect(&self) -> bool {
        self.path.is_empty()
    }
}

/// PDF Document wrapper providing form-level access to the object graph
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
}

impl PdfDocument {
    /// Open a PDF document from a file path
    ///
    /// # Arguments
    /// * `path` - Path to the PDF file
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("template.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| FormError::Unreadable(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Open a PDF document from bytes
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| FormError::Unreadable(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Wrap an already parsed lopdf document
    pub fn from_document(inner: Document) -> Self {
        Self { inner }
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Get all page object IDs in document order
    pub fn get_page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().values().copied().collect()
    }

    /// Get the object ID of a page (1-indexed)
    pub fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(FormError::InvalidPage(page, pages.len()))
    }

    /// Save the document to a file
    ///
    /// # Arguments
    /// * `path` - Output file path
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.inner
            .save(path)
            .map_err(|e| FormError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| FormError::WriteFailed(e.to_string()))?;
        Ok(buffer)
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Get a mutable reference to the underlying lopdf document
    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Object ID of the document catalog
    pub fn catalog_id(&self) -> Result<ObjectId> {
        let root = self
            .inner
            .trailer
            .get(b"Root")
            .map_err(|_| FormError::Structure("Document trailer missing Root entry".to_string()))?;
        root.as_reference()
            .map_err(|_| FormError::Structure("Root is not a reference".to_string()))
    }

    /// Resolve an entry to the object it designates
    ///
    /// Returns the object's identity when the entry is an indirect
    /// reference. Dangling references yield `None`.
    pub fn resolve<'a>(&'a self, entry: &'a Object) -> Option<(Option<ObjectId>, &'a Object)> {
        match entry {
            Object::Reference(id) => self.inner.get_object(*id).ok().map(|obj| (Some(*id), obj)),
            other => Some((None, other)),
        }
    }

    /// Resolve an entry and require it to be a dictionary
    pub fn resolve_dict<'a>(
        &'a self,
        entry: &'a Object,
    ) -> Option<(Option<ObjectId>, &'a Dictionary)> {
        let (id, obj) = self.resolve(entry)?;
        obj.as_dict().ok().map(|dict| (id, dict))
    }

    /// Whether an entry is a placeholder/absent node
    ///
    /// That is a direct `null`, a reference to an object that does not
    /// exist, or a reference to a `null` object.
    pub fn is_placeholder(&self, entry: &Object) -> bool {
        match entry {
            Object::Null => true,
            Object::Reference(id) => {
                matches!(self.inner.get_object(*id), Ok(Object::Null) | Err(_))
            }
            _ => false,
        }
    }

    /// The `/AcroForm` dictionary of the catalog, if any
    pub fn acroform(&self) -> Option<&Dictionary> {
        let catalog = self.inner.get_object(self.catalog_id().ok()?).ok()?;
        let entry = catalog.as_dict().ok()?.get(b"AcroForm").ok()?;
        self.resolve_dict(entry).map(|(_, dict)| dict)
    }

    /// Mutable access to the `/AcroForm` dictionary, if any
    pub fn acroform_mut(&mut self) -> Result<&mut Dictionary> {
        let catalog_id = self.catalog_id()?;
        let indirect = match self.inner.get_object(catalog_id)?.as_dict()?.get(b"AcroForm") {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(_) => None,
            Err(_) => {
                return Err(FormError::Structure(
                    "Catalog has no AcroForm dictionary".to_string(),
                ))
            }
        };

        let obj = match indirect {
            Some(id) => self.inner.get_object_mut(id)?,
            None => self
                .inner
                .get_object_mut(catalog_id)?
                .as_dict_mut()?
                .get_mut(b"AcroForm")?,
        };
        Ok(obj.as_dict_mut()?)
    }

    /// Locate the form index (`/AcroForm /Fields`)
    pub fn form_index_slot(&self) -> Option<ArraySlot> {
        let catalog_id = self.catalog_id().ok()?;
        self.locate_array(catalog_id, &[b"AcroForm", b"Fields"])
    }

    /// Locate a page's `/Annots` array
    pub fn annotations_slot(&self, page_id: ObjectId) -> Option<ArraySlot> {
        self.locate_array(page_id, &[b"Annots"])
    }

    /// Entries of a page's `/Annots` array (empty when the page has none)
    pub fn annotations(&self, page_id: ObjectId) -> &[Object] {
        self.annotations_slot(page_id)
            .and_then(|slot| self.array(&slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Make sure a form index exists and return its location
    ///
    /// Creates `/AcroForm` (inline in the catalog) and/or an empty `/Fields`
    /// array when they are missing or not of the expected type. An existing
    /// array is never replaced.
    pub fn ensure_form_index(&mut self) -> Result<ArraySlot> {
        if let Some(slot) = self.form_index_slot() {
            return Ok(slot);
        }

        if self.acroform().is_none() {
            let catalog_id = self.catalog_id()?;
            let catalog = self.inner.get_object_mut(catalog_id)?.as_dict_mut()?;
            catalog.set("AcroForm", Object::Dictionary(Dictionary::new()));
        }
        self.acroform_mut()?
            .set("Fields", Object::Array(Vec::new()));

        self.form_index_slot()
            .ok_or_else(|| FormError::Structure("Failed to install form index".to_string()))
    }

    /// Read an array through its slot
    pub fn array(&self, slot: &ArraySlot) -> Option<&Vec<Object>> {
        let mut obj = self.inner.get_object(slot.owner).ok()?;
        for key in &slot.path {
            obj = obj.as_dict().ok()?.get(key).ok()?;
        }
        obj.as_array().ok()
    }

    /// Mutable access to an array through its slot
    pub fn array_mut(&mut self, slot: &ArraySlot) -> Result<&mut Vec<Object>> {
        let mut obj = self.inner.get_object_mut(slot.owner)?;
        for key in &slot.path {
            obj = obj.as_dict_mut()?.get_mut(key)?;
        }
        Ok(obj.as_array_mut()?)
    }

    /// Mutable access to a dictionary stored directly in an array
    pub fn array_dict_mut(&mut self, slot: &ArraySlot, index: usize) -> Result<&mut Dictionary> {
        let array = self.array_mut(slot)?;
        let len = array.len();
        let entry = array.get_mut(index).ok_or_else(|| {
            FormError::Structure(format!("Array index {index} out of bounds ({len} entries)"))
        })?;
        Ok(entry.as_dict_mut()?)
    }

    /// Move an array entry into an indirect object of its own
    ///
    /// The entry is replaced by a reference to the new object, so its
    /// contents stay the same but gain an identity. An entry that already is
    /// a reference is left alone.
    pub fn promote_array_entry(&mut self, slot: &ArraySlot, index: usize) -> Result<ObjectId> {
        let entry = self
            .array(slot)
            .and_then(|array| array.get(index))
            .cloned()
            .ok_or_else(|| FormError::Structure(format!("No array entry at index {index}")))?;
        if let Object::Reference(id) = entry {
            return Ok(id);
        }

        let id = self.inner.add_object(entry);
        self.array_mut(slot)?[index] = Object::Reference(id);
        Ok(id)
    }

    /// Mutable access to an indirect dictionary object
    pub fn dict_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary> {
        Ok(self.inner.get_object_mut(id)?.as_dict_mut()?)
    }

    /// Follow `keys` from `owner`, switching owner at every indirect hop
    fn locate_array(&self, owner: ObjectId, keys: &[&[u8]]) -> Option<ArraySlot> {
        let mut slot = ArraySlot {
            owner,
            path: Vec::new(),
        };
        let mut obj = self.inner.get_object(owner).ok()?;

        for key in keys {
            match obj.as_dict().ok()?.get(key).ok()? {
                Object::Reference(id) => {
                    slot.owner = *id;
                    slot.path.clear();
                    obj = self.inner.get_object(*id).ok()?;
                }
                value => {
                    slot.path.push(key.to_vec());
                    obj = value;
                }
            }
        }

        obj.as_array().ok().map(|_| slot)
    }
}
